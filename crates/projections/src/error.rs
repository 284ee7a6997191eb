//! Projection error types.

use thiserror::Error;

/// Errors that can occur while replaying or storing projections.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event log.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// A database error occurred in the projection store.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize the projection for hashing or storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
