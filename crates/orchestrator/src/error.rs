//! Orchestrator error types.

use event_store::EventStoreError;
use idempotency::IdempotencyError;
use projections::ProjectionError;
use saga::SagaError;
use thiserror::Error;

/// Infrastructure failures behind an `INTERNAL_ERROR` envelope.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Idempotency store error: {0}")]
    Idempotency(#[from] IdempotencyError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
