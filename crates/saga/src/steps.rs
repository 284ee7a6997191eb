//! Step names and the human-readable messages recorded for them.

use std::str::FromStr;

use serde_json::Value;

/// Step name used for saga-level lifecycle events.
pub const LIFECYCLE_STEP: &str = "SagaLifecycle";

/// The steps of a saga run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaStep {
    ValidateRequest,
    RouteRegion,
    PolicyGate,
    GenerateGreeting,
    EnhanceGreeting,
    ComputeSentiment,
    CalculateEsgOffset,
    AssessMoat,
    PersistEnrichmentArtifacts,
    PersistOutcome,
    PublishTelemetry,
}

impl SagaStep {
    pub const ALL: [SagaStep; 11] = [
        SagaStep::ValidateRequest,
        SagaStep::RouteRegion,
        SagaStep::PolicyGate,
        SagaStep::GenerateGreeting,
        SagaStep::EnhanceGreeting,
        SagaStep::ComputeSentiment,
        SagaStep::CalculateEsgOffset,
        SagaStep::AssessMoat,
        SagaStep::PersistEnrichmentArtifacts,
        SagaStep::PersistOutcome,
        SagaStep::PublishTelemetry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::ValidateRequest => "ValidateRequestStep",
            SagaStep::RouteRegion => "RouteRegionStep",
            SagaStep::PolicyGate => "PolicyGateStep",
            SagaStep::GenerateGreeting => "GenerateGreetingStep",
            SagaStep::EnhanceGreeting => "EnhanceGreetingStep",
            SagaStep::ComputeSentiment => "ComputeSentimentStep",
            SagaStep::CalculateEsgOffset => "CalculateEsgOffsetStep",
            SagaStep::AssessMoat => "AssessMoatStep",
            SagaStep::PersistEnrichmentArtifacts => "PersistEnrichmentArtifactsStep",
            SagaStep::PersistOutcome => "PersistOutcomeStep",
            SagaStep::PublishTelemetry => "PublishTelemetryStep",
        }
    }

    /// Message recorded when the step completes.
    ///
    /// `payload` is the step's event payload; only routing reads it.
    pub fn completed_message(&self, payload: Option<&Value>) -> String {
        match self {
            SagaStep::ValidateRequest => "Request schema and governance envelope accepted".into(),
            SagaStep::RouteRegion => {
                let region = payload
                    .and_then(|p| p.get("selectedRegion"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                format!("Selected region {region}")
            }
            SagaStep::PolicyGate => "Policy checks passed".into(),
            SagaStep::GenerateGreeting => "Greeting rendered by formality strategy".into(),
            SagaStep::EnhanceGreeting => "Greeting enhanced by deterministic faux-LLM".into(),
            SagaStep::ComputeSentiment => {
                "Sentiment score calibrated for AI-native observability".into()
            }
            SagaStep::CalculateEsgOffset => {
                "Carbon offset calculations posted to synthetic ledger".into()
            }
            SagaStep::AssessMoat => "Moat scoring dimensions computed for diligence theater".into(),
            SagaStep::PersistEnrichmentArtifacts => {
                "Enrichment artifacts persisted to durable ledgers".into()
            }
            SagaStep::PersistOutcome => "Outcome persisted to event log".into(),
            SagaStep::PublishTelemetry => "Telemetry counters updated".into(),
        }
    }

    /// Message recorded when the step fails, derived from its failure payload.
    pub fn failed_message(&self, payload: Option<&Value>) -> String {
        if let Some(timeout_ms) = payload
            .filter(|p| p.get("deadlineExceeded").and_then(Value::as_bool) == Some(true))
            .and_then(|p| p.get("timeoutMs"))
            .and_then(Value::as_u64)
        {
            return deadline_message(timeout_ms);
        }

        match self {
            SagaStep::PolicyGate => payload
                .and_then(|p| p.get("decisions"))
                .and_then(Value::as_array)
                .map(|decisions| {
                    decisions
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default(),
            SagaStep::GenerateGreeting => {
                "Synthetic timeout injected by deterministic chaos engine".into()
            }
            SagaStep::EnhanceGreeting => "Enrichment pipeline failed before persistence".into(),
            SagaStep::PersistEnrichmentArtifacts => "Durable enrichment writes failed".into(),
            other => format!("{} failed", other.as_str()),
        }
    }
}

/// Message recorded for a step that was cut off by the request deadline.
pub fn deadline_message(timeout_ms: u64) -> String {
    format!("Saga deadline of {timeout_ms}ms exceeded")
}

/// Message recorded for a compensated step.
pub fn compensated_message(step: &str) -> String {
    format!("Compensated {step}")
}

impl std::fmt::Display for SagaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SagaStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SagaStep::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown saga step: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_roundtrip() {
        for step in SagaStep::ALL {
            assert_eq!(step.as_str().parse::<SagaStep>().unwrap(), step);
        }
        assert!(LIFECYCLE_STEP.parse::<SagaStep>().is_err());
    }

    #[test]
    fn routing_message_reads_payload() {
        let payload = json!({"selectedRegion": "eu-west-1"});
        assert_eq!(
            SagaStep::RouteRegion.completed_message(Some(&payload)),
            "Selected region eu-west-1"
        );
    }

    #[test]
    fn policy_failure_joins_decisions() {
        let payload = json!({"decisions": ["a", "b"]});
        assert_eq!(SagaStep::PolicyGate.failed_message(Some(&payload)), "a; b");
    }

    #[test]
    fn deadline_failure_overrides_step_message() {
        let payload = json!({"deadlineExceeded": true, "timeoutMs": 250});
        assert_eq!(
            SagaStep::EnhanceGreeting.failed_message(Some(&payload)),
            "Saga deadline of 250ms exceeded"
        );
    }
}
