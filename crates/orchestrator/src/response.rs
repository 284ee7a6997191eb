//! Response envelopes returned by
//! [`RequestOrchestrator::execute`](crate::RequestOrchestrator::execute).

use common::ErrorCode;
use domain::{EnrichmentBundle, PolicyEvaluation};
use saga::{
    ChaosReport, GreetingOutput, IncidentSummary, MetricsSnapshot, RoutingDecision,
    RunbookSummary, SagaExecution,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Trace id reported when the caller opted out of tracing.
pub const SUPPRESSED_TRACE_ID: &str = "suppressed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// The saga ran for this delivery.
    Processed,
    /// The response was served from the idempotency ledger.
    Deduplicated,
}

/// Where the run left the event log and projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Durability {
    pub event_log_offset: i64,
    pub projection_version: u64,
    pub replayable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub request_id: String,
    pub trace_id: String,
    pub delivery_status: DeliveryStatus,
    pub greeting: GreetingOutput,
    pub policy: PolicyEvaluation,
    pub metrics: MetricsSnapshot,
    pub saga_execution: SagaExecution,
    pub routing_decision: RoutingDecision,
    pub chaos_report: ChaosReport,
    pub durability: Durability,
    pub runbook: RunbookSummary,
    #[serde(flatten)]
    pub enrichment: EnrichmentBundle,
    pub incident: IncidentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub request_id: String,
    pub trace_id: String,
    pub delivery_status: DeliveryStatus,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrchestratorResult {
    Success(Box<SuccessResponse>),
    Error(ErrorResponse),
}

impl OrchestratorResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OrchestratorResult::Success(_))
    }

    pub fn request_id(&self) -> &str {
        match self {
            OrchestratorResult::Success(success) => &success.request_id,
            OrchestratorResult::Error(error) => &error.request_id,
        }
    }

    pub fn delivery_status(&self) -> DeliveryStatus {
        match self {
            OrchestratorResult::Success(success) => success.delivery_status,
            OrchestratorResult::Error(error) => error.delivery_status,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            OrchestratorResult::Success(_) => None,
            OrchestratorResult::Error(error) => Some(error.error.code),
        }
    }

    pub(crate) fn with_delivery_status(mut self, status: DeliveryStatus) -> Self {
        match &mut self {
            OrchestratorResult::Success(success) => success.delivery_status = status,
            OrchestratorResult::Error(error) => error.delivery_status = status,
        }
        self
    }
}
