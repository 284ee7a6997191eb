//! Deterministic runbook synthesis for raised incidents.

use serde::{Deserialize, Serialize};
use serde_json::json;

pub const RUNBOOK_GENERATOR_ID: &str = "deterministic-runbook-synth-v1";

const ACTION_POOL: [&str; 8] = [
    "Assemble virtual war-room with governance observer.",
    "Capture deterministic replay checksum for investor packet.",
    "Compare regional failover telemetry against policy envelope.",
    "Validate idempotency ledger for payload drift anomalies.",
    "Escalate to architecture theater review board.",
    "Issue carbon-neutral remediation narrative to stakeholders.",
    "Run synthetic recovery game-day before closeout.",
    "Archive enriched traces in compliance annex.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "sev-1")]
    Sev1,
    #[serde(rename = "sev-2")]
    Sev2,
    #[serde(rename = "sev-3")]
    Sev3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Sev1 => "sev-1",
            Severity::Sev2 => "sev-2",
            Severity::Sev3 => "sev-3",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunbookPlan {
    pub title: String,
    pub actions: Vec<String>,
    pub fingerprint: String,
    pub generator_id: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunbookGenerationEngine;

impl RunbookGenerationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Picks three to five numbered actions from the fixed pool, keyed by
    /// the hash of the incident.
    pub fn generate(
        &self,
        incident_id: &str,
        severity: Severity,
        title: &str,
        details: &str,
        code: &str,
    ) -> RunbookPlan {
        let fingerprint = common::hash_string(&common::canonical_json(&json!({
            "incidentId": incident_id,
            "severity": severity.as_str(),
            "title": title,
            "details": details,
            "code": code,
        })));
        let signal = common::signal_from_hex(&fingerprint) as usize;

        let action_count = 3 + signal % 3;
        let actions = (0..action_count)
            .map(|idx| format!("{}. {}", idx + 1, ACTION_POOL[(signal + idx) % ACTION_POOL.len()]))
            .collect();

        RunbookPlan {
            title: format!("Runbook for {code} ({severity})"),
            actions,
            fingerprint,
            generator_id: RUNBOOK_GENERATOR_ID.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_is_deterministic_and_numbered() {
        let engine = RunbookGenerationEngine::new();
        let plan = engine.generate(
            "incident-1",
            Severity::Sev2,
            "POLICY_DENIED during orchestration",
            "Request rejected by strict-default policy",
            "POLICY_DENIED",
        );

        assert_eq!(plan.title, "Runbook for POLICY_DENIED (sev-2)");
        assert_eq!(plan.generator_id, RUNBOOK_GENERATOR_ID);
        assert!((3..=5).contains(&plan.actions.len()));
        for (idx, action) in plan.actions.iter().enumerate() {
            assert!(action.starts_with(&format!("{}. ", idx + 1)));
            assert!(ACTION_POOL.iter().any(|a| action.ends_with(a)));
        }

        let again = engine.generate(
            "incident-1",
            Severity::Sev2,
            "POLICY_DENIED during orchestration",
            "Request rejected by strict-default policy",
            "POLICY_DENIED",
        );
        assert_eq!(plan, again);
    }

    #[test]
    fn different_incidents_get_different_fingerprints() {
        let engine = RunbookGenerationEngine::new();
        let a = engine.generate("a", Severity::Sev3, "t", "d", "CHAOS_TIMEOUT");
        let b = engine.generate("b", Severity::Sev3, "t", "d", "CHAOS_TIMEOUT");
        assert_ne!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn severity_wire_names() {
        assert_eq!(serde_json::to_value(Severity::Sev1).unwrap(), "sev-1");
        let parsed: Severity = serde_json::from_str("\"sev-3\"").unwrap();
        assert_eq!(parsed, Severity::Sev3);
    }
}
