//! Collaborator traits the saga engine calls out to, with in-memory
//! implementations.

pub mod enrichment;
pub mod metrics;
pub mod operations;

pub use enrichment::{
    DeterministicEnrichmentPipeline, EnrichmentContext, EnrichmentError, EnrichmentLedgers,
    EnrichmentPipeline,
};
pub use metrics::{InMemoryMetrics, MetricsSink, MetricsSnapshot};
pub use operations::{
    IncidentRecord, IncidentRequest, IncidentSink, OperationsService, RaisedIncident,
    RunbookGenerationRecord, RunbookRecord,
};

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// A panic while holding one of these locks leaves plain data behind, so
// later callers keep using it.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
