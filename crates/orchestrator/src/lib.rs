//! Request orchestration over the saga engine.
//!
//! [`RequestOrchestrator::execute`] validates a raw request, fingerprints
//! the normalized form, consults the idempotency ledger, runs the saga and
//! caches the response. [`Application`] wires every store and collaborator
//! together, in memory or over PostgreSQL.

pub mod app;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod response;

pub use app::{Application, IncidentView};
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use orchestrator::RequestOrchestrator;
pub use response::{
    DeliveryStatus, Durability, ErrorBody, ErrorResponse, OrchestratorResult, SUPPRESSED_TRACE_ID,
    SuccessResponse,
};
