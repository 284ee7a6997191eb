//! Saga and step status.

use serde::{Deserialize, Serialize};

/// The status of a saga execution.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           ├──► Compensated
///           └──► Failed
/// ```
///
/// `Failed` is reserved for runs whose compensation could not be carried
/// out; no current step produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SagaStatus {
    #[default]
    Running,
    Completed,
    Compensated,
    Failed,
}

impl SagaStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SagaStatus::Running)
    }

    /// Returns true if the state machine allows moving to `next`.
    pub fn can_transition_to(&self, next: SagaStatus) -> bool {
        matches!(self, SagaStatus::Running) && next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Running => "running",
            SagaStatus::Completed => "completed",
            SagaStatus::Compensated => "compensated",
            SagaStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status of one step result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Failed,
    Compensated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_running() {
        assert_eq!(SagaStatus::default(), SagaStatus::Running);
    }

    #[test]
    fn test_transitions() {
        assert!(SagaStatus::Running.can_transition_to(SagaStatus::Completed));
        assert!(SagaStatus::Running.can_transition_to(SagaStatus::Compensated));
        assert!(SagaStatus::Running.can_transition_to(SagaStatus::Failed));
        assert!(!SagaStatus::Running.can_transition_to(SagaStatus::Running));
        assert!(!SagaStatus::Completed.can_transition_to(SagaStatus::Compensated));
        assert!(!SagaStatus::Compensated.can_transition_to(SagaStatus::Completed));
        assert!(!SagaStatus::Failed.can_transition_to(SagaStatus::Compensated));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SagaStatus::Running.is_terminal());
        assert!(SagaStatus::Completed.is_terminal());
        assert!(SagaStatus::Compensated.is_terminal());
        assert!(SagaStatus::Failed.is_terminal());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_value(SagaStatus::Compensated).unwrap(),
            serde_json::json!("compensated")
        );
        assert_eq!(
            serde_json::to_value(StepStatus::Failed).unwrap(),
            serde_json::json!("failed")
        );
        assert_eq!(SagaStatus::Completed.to_string(), "completed");
    }
}
