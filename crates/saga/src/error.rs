//! Saga error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::state::SagaStatus;

/// Infrastructure errors that stop a saga run.
///
/// Business failures (policy denial, chaos timeout, enrichment failures)
/// are not errors: they end in a compensated
/// [`SagaRunFailure`](crate::SagaRunFailure).
#[derive(Debug, Error)]
pub enum SagaError {
    /// A status transition that the state machine forbids.
    #[error("Invalid saga transition from {from} to {to}")]
    InvalidTransition { from: SagaStatus, to: SagaStatus },

    /// Event log error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operations collaborator could not record an incident.
    #[error("Incident sink error: {0}")]
    IncidentSink(String),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
