//! Orchestrator settings.

use std::sync::Arc;
use std::time::Duration;

use domain::{DEFAULT_MAX_METADATA_ENTRIES, PolicyGate, StrictDefaultPolicy, ValidationRules};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Locales accepted by validation and by the policy gate.
    pub supported_locales: Vec<String>,
    pub max_metadata_entries: usize,
    /// Bound each saga run by the request's `delivery.timeoutMs`.
    pub enforce_deadline: bool,
    /// How long a pending idempotency reservation may go without a
    /// response before another delivery takes it over.
    pub reservation_stale_after: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            supported_locales: vec!["en-US".to_string()],
            max_metadata_entries: DEFAULT_MAX_METADATA_ENTRIES,
            enforce_deadline: true,
            reservation_stale_after: Duration::from_secs(120),
        }
    }
}

impl OrchestratorConfig {
    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            supported_locales: self.supported_locales.clone(),
        }
    }

    pub fn policy(&self) -> Arc<dyn PolicyGate> {
        Arc::new(StrictDefaultPolicy::new(
            self.supported_locales.clone(),
            self.max_metadata_entries,
        ))
    }
}
