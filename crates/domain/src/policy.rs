//! Policy gate evaluated before any greeting is rendered.

use serde::{Deserialize, Serialize};

use crate::request::SagaRequest;

/// Metadata entry limit enforced when `enforceMetadataRules` is set.
pub const DEFAULT_MAX_METADATA_ENTRIES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyOutcome {
    Allowed,
    Denied,
}

/// Result of a policy evaluation: the outcome plus one line per rule checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEvaluation {
    pub outcome: PolicyOutcome,
    pub decisions: Vec<String>,
}

impl PolicyEvaluation {
    pub fn is_allowed(&self) -> bool {
        self.outcome == PolicyOutcome::Allowed
    }
}

/// Decides whether a validated request may proceed.
pub trait PolicyGate: Send + Sync {
    fn evaluate(&self, request: &SagaRequest) -> PolicyEvaluation;
}

/// The `strict-default` compliance profile.
#[derive(Debug, Clone)]
pub struct StrictDefaultPolicy {
    supported_locales: Vec<String>,
    max_metadata_entries: usize,
}

impl StrictDefaultPolicy {
    pub fn new(supported_locales: Vec<String>, max_metadata_entries: usize) -> Self {
        Self {
            supported_locales,
            max_metadata_entries,
        }
    }

    pub fn max_metadata_entries(&self) -> usize {
        self.max_metadata_entries
    }
}

impl Default for StrictDefaultPolicy {
    fn default() -> Self {
        Self::new(vec!["en-US".to_string()], DEFAULT_MAX_METADATA_ENTRIES)
    }
}

impl PolicyGate for StrictDefaultPolicy {
    #[tracing::instrument(skip(self, request), fields(locale = %request.locale))]
    fn evaluate(&self, request: &SagaRequest) -> PolicyEvaluation {
        let mut decisions = Vec::new();
        let mut outcome = PolicyOutcome::Allowed;

        if self.supported_locales.iter().any(|l| l == &request.locale) {
            decisions.push(format!("Locale \"{}\" accepted", request.locale));
        } else {
            outcome = PolicyOutcome::Denied;
            decisions.push(format!("Locale \"{}\" is not allowed", request.locale));
        }

        let entries = request.metadata_len();
        if request.policies.enforce_metadata_rules {
            if entries > self.max_metadata_entries {
                outcome = PolicyOutcome::Denied;
                decisions.push(format!(
                    "Metadata contains {entries} entries; maximum is {}",
                    self.max_metadata_entries
                ));
            } else {
                decisions.push(format!(
                    "Metadata rules enforced ({entries} entries within limit)"
                ));
            }
        } else {
            decisions.push("Metadata rules not enforced by policy".to_string());
        }

        tracing::debug!(?outcome, "Policy evaluated");
        PolicyEvaluation { outcome, decisions }
    }
}
