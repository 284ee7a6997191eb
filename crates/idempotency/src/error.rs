use thiserror::Error;

/// Errors that can occur when interacting with the idempotency ledger.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// The pending reservation for this key was released, taken over or
    /// already completed.
    #[error("Idempotency reservation lost: {0}")]
    ReservationLost(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for idempotency ledger operations.
pub type Result<T> = std::result::Result<T, IdempotencyError>;
