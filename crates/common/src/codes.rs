use serde::{Deserialize, Serialize};

/// Stable error codes returned in failure envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request failed schema or constraint validation.
    ValidationFailed,
    /// The policy gate denied the request.
    PolicyDenied,
    /// A deterministic chaos timeout or an expired saga deadline.
    ChaosTimeout,
    /// The enrichment pipeline failed while producing artifacts.
    EnrichmentPipelineFailed,
    /// Enrichment artifacts could not be persisted.
    EnrichmentPersistFailed,
    /// An idempotency key was reused with a different payload.
    IdempotencyConflict,
    /// Infrastructure failure outside the saga's failure taxonomy.
    InternalError,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::PolicyDenied => "POLICY_DENIED",
            ErrorCode::ChaosTimeout => "CHAOS_TIMEOUT",
            ErrorCode::EnrichmentPipelineFailed => "ENRICHMENT_PIPELINE_FAILED",
            ErrorCode::EnrichmentPersistFailed => "ENRICHMENT_PERSIST_FAILED",
            ErrorCode::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
