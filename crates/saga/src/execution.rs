//! Saga execution record and its reconstruction from the event log.

use common::SagaId;
use event_store::{EventType, SagaEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SagaError};
use crate::state::{SagaStatus, StepStatus};
use crate::steps::{LIFECYCLE_STEP, SagaStep};

/// Outcome of one step, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub status: StepStatus,
    pub message: String,
}

impl StepResult {
    pub fn completed(step: SagaStep, message: impl Into<String>) -> Self {
        Self {
            step: step.as_str().to_string(),
            status: StepStatus::Completed,
            message: message.into(),
        }
    }

    pub fn failed(step: SagaStep, message: impl Into<String>) -> Self {
        Self {
            step: step.as_str().to_string(),
            status: StepStatus::Failed,
            message: message.into(),
        }
    }
}

/// A saga run: its id, status and ordered step results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaExecution {
    pub saga_id: SagaId,
    pub status: SagaStatus,
    pub steps: Vec<StepResult>,
}

impl SagaExecution {
    /// Starts a new execution in the `running` state.
    pub fn start(saga_id: SagaId) -> Self {
        Self {
            saga_id,
            status: SagaStatus::Running,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    /// Moves to a terminal status. Terminal states are final.
    pub fn finish(&mut self, status: SagaStatus) -> Result<()> {
        if !self.status.can_transition_to(status) {
            return Err(SagaError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }

    /// Rebuilds an execution from its events, in offset order.
    ///
    /// Returns `None` when no event belongs to the saga.
    pub fn from_events(saga_id: SagaId, events: &[SagaEvent]) -> Option<Self> {
        let mut execution = Self::start(saga_id);
        let mut seen = false;

        for event in events.iter().filter(|e| e.saga_id == saga_id) {
            seen = true;
            let payload = event.payload.as_ref();

            if event.step == LIFECYCLE_STEP {
                let status = match event.event_type {
                    EventType::SagaCompleted => SagaStatus::Completed,
                    EventType::SagaCompensated => SagaStatus::Compensated,
                    EventType::SagaFailed => SagaStatus::Failed,
                    _ => continue,
                };
                if let Err(err) = execution.finish(status) {
                    tracing::warn!(
                        %saga_id,
                        offset = %event.offset,
                        error = %err,
                        "Ignoring extra terminal event"
                    );
                }
                continue;
            }

            let known = event.step.parse::<SagaStep>().ok();
            let (status, message) = match event.event_type {
                EventType::StepCompleted => (
                    StepStatus::Completed,
                    known
                        .map(|s| s.completed_message(payload))
                        .unwrap_or_default(),
                ),
                EventType::StepFailed => (
                    StepStatus::Failed,
                    known.map(|s| s.failed_message(payload)).unwrap_or_default(),
                ),
                EventType::StepCompensated => (
                    StepStatus::Compensated,
                    payload
                        .and_then(|p| p.get("message"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                ),
                _ => continue,
            };

            execution.record(StepResult {
                step: event.step.clone(),
                status,
                message,
            });
        }

        seen.then_some(execution)
    }
}
