//! What a saga run hands back to its caller.

use common::ErrorCode;
use domain::{EnrichmentBundle, Formality, PolicyEvaluation, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::execution::SagaExecution;

const STEADY_STATE_TITLE: &str = "Steady State Runbook";
const STEADY_STATE_ACTIONS: [&str; 2] = [
    "Observe green dashboard and celebrate unnecessary complexity.",
    "Archive audit trail for future architecture review board.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub selected_region: String,
    pub attempts: u32,
    pub fallback_used: bool,
}

/// Faults accumulated over every chaos decision of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosReport {
    pub injected_faults: Vec<String>,
    /// Key of the last decision taken.
    pub deterministic_key: String,
    pub simulated_latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunbookSummary {
    pub id: Uuid,
    pub title: String,
    pub actions: Vec<String>,
}

impl RunbookSummary {
    /// Runbook attached to runs that raised no incident.
    pub fn steady_state() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: STEADY_STATE_TITLE.to_string(),
            actions: STEADY_STATE_ACTIONS.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl IncidentSummary {
    pub fn none() -> Self {
        Self {
            created: false,
            id: None,
            severity: None,
        }
    }

    pub fn raised(id: Uuid, severity: Severity) -> Self {
        Self {
            created: true,
            id: Some(id),
            severity: Some(severity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetingOutput {
    pub rendered: String,
    pub edition: String,
    pub locale: String,
    pub formality: Formality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaRunSuccess {
    pub greeting: GreetingOutput,
    pub policy: PolicyEvaluation,
    pub saga_execution: SagaExecution,
    pub routing_decision: RoutingDecision,
    pub chaos_report: ChaosReport,
    pub runbook: RunbookSummary,
    #[serde(flatten)]
    pub enrichment: EnrichmentBundle,
    pub incident: IncidentSummary,
}

/// A run that was aborted and compensated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaRunFailure {
    pub code: ErrorCode,
    pub message: String,
    /// Failure-specific context, e.g. policy decisions or the chaos key.
    pub details: Value,
    pub saga_execution: SagaExecution,
    pub routing_decision: RoutingDecision,
    pub chaos_report: ChaosReport,
    pub runbook: RunbookSummary,
    #[serde(flatten)]
    pub enrichment: EnrichmentBundle,
    pub incident: IncidentSummary,
}

#[derive(Debug, Clone)]
pub enum SagaRunResult {
    Success(Box<SagaRunSuccess>),
    Failure(Box<SagaRunFailure>),
}

impl SagaRunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SagaRunResult::Success(_))
    }

    pub fn saga_execution(&self) -> &SagaExecution {
        match self {
            SagaRunResult::Success(success) => &success.saga_execution,
            SagaRunResult::Failure(failure) => &failure.saga_execution,
        }
    }
}
