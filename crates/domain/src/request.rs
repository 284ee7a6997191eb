//! The orchestration request, its section defaults and validation.
//!
//! A [`SagaRequest`] is only ever constructed through [`SagaRequest::parse`],
//! which deserializes the raw JSON (dropping unknown fields and filling
//! omitted sections with their defaults) and then checks every constraint.
//! Two requests that differ only by omitted-vs-explicit defaults therefore
//! serialize, and hash, identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ValidationError, ValidationIssue};

const MAX_REQUEST_ID_LEN: usize = 128;
const MAX_RECIPIENT_LEN: usize = 256;
const MAX_METADATA_KEY_LEN: usize = 64;
const MAX_METADATA_VALUE_LEN: usize = 256;
const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;
const MAX_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRY_BUDGET: u32 = 5;
const MAX_REGION_LEN: usize = 64;
const MAX_FALLBACK_REGIONS: usize = 5;
const MAX_LATENCY_JITTER_MS: u64 = 5_000;
const MAX_CHANGE_TICKET_LEN: usize = 64;
const MAX_SEED_LEN: usize = 128;
const MAX_PERSONALIZATION_DEPTH: u32 = 5;
const MAX_MINIMUM_VIABLE_MOAT: u32 = 100;
const MAX_REGION_INTENSITY: u32 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    Casual,
    Professional,
    Formal,
}

impl Formality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Formality::Casual => "casual",
            Formality::Professional => "professional",
            Formality::Formal => "formal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceProfile {
    #[default]
    StrictDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SagaMode {
    #[default]
    AlwaysOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompensationPolicy {
    #[default]
    StrictRevert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChaosProfile {
    #[default]
    Deterministic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiProfile {
    #[default]
    InvestorFriendly,
    BoardReady,
    ThoughtLeadership,
}

impl AiProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProfile::InvestorFriendly => "investor-friendly",
            AiProfile::BoardReady => "board-ready",
            AiProfile::ThoughtLeadership => "thought-leadership",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EsgProvider {
    #[default]
    ParodyOffsetsInc,
    GreenwashFuturesLlc,
}

impl EsgProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            EsgProvider::ParodyOffsetsInc => "parody-offsets-inc",
            EsgProvider::GreenwashFuturesLlc => "greenwash-futures-llc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoatStrategy {
    #[default]
    NarrativeWeighted,
    ComplexityMax,
}

impl MoatStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoatStrategy::NarrativeWeighted => "narrative-weighted",
            MoatStrategy::ComplexityMax => "complexity-max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySettings {
    pub compliance_profile: ComplianceProfile,
    pub enforce_metadata_rules: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySettings {
    pub include_trace: bool,
    pub include_policy_decisions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySettings {
    pub idempotency_key: String,
    pub timeout_ms: u64,
    pub retry_budget: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingSettings {
    pub preferred_region: String,
    #[serde(default)]
    pub fallback_regions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SagaSettings {
    pub mode: SagaMode,
    pub compensation_policy: CompensationPolicy,
    pub persist_every_step: bool,
}

impl Default for SagaSettings {
    fn default() -> Self {
        Self {
            mode: SagaMode::AlwaysOn,
            compensation_policy: CompensationPolicy::StrictRevert,
            persist_every_step: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChaosSettings {
    pub profile: ChaosProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    pub partition_simulation: bool,
    pub latency_jitter_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceSettings {
    pub change_ticket: String,
    pub risk_class: RiskClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AiEnhancementSettings {
    pub enabled: bool,
    pub profile: AiProfile,
    pub personalization_depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

impl Default for AiEnhancementSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            profile: AiProfile::InvestorFriendly,
            personalization_depth: 2,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EsgOffsetSettings {
    pub enabled: bool,
    pub target_net_zero: bool,
    pub provider: EsgProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_intensity_override: Option<u32>,
}

impl Default for EsgOffsetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_net_zero: true,
            provider: EsgProvider::ParodyOffsetsInc,
            region_intensity_override: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoatScoreSettings {
    pub enabled: bool,
    pub strategy: MoatStrategy,
    pub include_architecture_theater: bool,
    pub minimum_viable_moat: u32,
}

impl Default for MoatScoreSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: MoatStrategy::NarrativeWeighted,
            include_architecture_theater: true,
            minimum_viable_moat: 42,
        }
    }
}

/// A validated, normalized orchestration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub recipient: String,
    pub formality: Formality,
    pub locale: String,
    #[serde(default)]
    pub include_timestamp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    pub policies: PolicySettings,
    pub telemetry: TelemetrySettings,
    pub delivery: DeliverySettings,
    #[serde(default)]
    pub trace_context: TraceContext,
    pub routing: RoutingSettings,
    #[serde(default)]
    pub saga: SagaSettings,
    #[serde(default)]
    pub chaos: ChaosSettings,
    pub governance: GovernanceSettings,
    #[serde(default)]
    pub ai_enhancement: AiEnhancementSettings,
    #[serde(default)]
    pub esg_offset: EsgOffsetSettings,
    #[serde(default)]
    pub moat_score: MoatScoreSettings,
}

/// Configurable validation limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    /// Locales accepted by the strict-default compliance profile.
    pub supported_locales: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            supported_locales: vec!["en-US".to_string()],
        }
    }
}

impl SagaRequest {
    /// Deserializes and validates a raw request document.
    pub fn parse(raw: &Value, rules: &ValidationRules) -> Result<Self, ValidationError> {
        let request: SagaRequest =
            serde_json::from_value(raw.clone()).map_err(|e| ValidationError {
                issues: vec![ValidationIssue::new("", e.to_string())],
            })?;
        request.validate(rules)?;
        Ok(request)
    }

    /// Checks every field constraint, collecting all issues.
    pub fn validate(&self, rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if let Some(ref request_id) = self.request_id {
            check_len(&mut issues, "requestId", request_id, MAX_REQUEST_ID_LEN);
        }
        check_len(&mut issues, "recipient", &self.recipient, MAX_RECIPIENT_LEN);
        if !rules.supported_locales.iter().any(|l| l == &self.locale) {
            issues.push(ValidationIssue::new(
                "locale",
                "Locale is not supported by strict-default policy",
            ));
        }

        if let Some(ref metadata) = self.metadata {
            for (key, value) in metadata {
                let path = format!("metadata.{key}");
                check_len(&mut issues, &path, key, MAX_METADATA_KEY_LEN);
                if !key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
                {
                    issues.push(ValidationIssue::new(
                        path.clone(),
                        "Metadata keys may only contain letters, digits, '.', '_' and '-'",
                    ));
                }
                check_len(&mut issues, &path, value, MAX_METADATA_VALUE_LEN);
            }
        }

        check_len(
            &mut issues,
            "delivery.idempotencyKey",
            &self.delivery.idempotency_key,
            MAX_IDEMPOTENCY_KEY_LEN,
        );
        check_range(
            &mut issues,
            "delivery.timeoutMs",
            self.delivery.timeout_ms,
            1,
            MAX_TIMEOUT_MS,
        );
        check_range(
            &mut issues,
            "delivery.retryBudget",
            self.delivery.retry_budget.into(),
            0,
            MAX_RETRY_BUDGET.into(),
        );
        if let Some(ref correlation_id) = self.trace_context.correlation_id {
            check_len(
                &mut issues,
                "traceContext.correlationId",
                correlation_id,
                MAX_REQUEST_ID_LEN,
            );
        }

        check_region(&mut issues, "routing.preferredRegion", &self.routing.preferred_region);
        if self.routing.fallback_regions.len() > MAX_FALLBACK_REGIONS {
            issues.push(ValidationIssue::new(
                "routing.fallbackRegions",
                format!("At most {MAX_FALLBACK_REGIONS} fallback regions are allowed"),
            ));
        }
        for (idx, region) in self.routing.fallback_regions.iter().enumerate() {
            check_region(&mut issues, &format!("routing.fallbackRegions.{idx}"), region);
        }

        if let Some(ref seed) = self.chaos.seed {
            check_len(&mut issues, "chaos.seed", seed, MAX_SEED_LEN);
        }
        check_range(
            &mut issues,
            "chaos.latencyJitterMs",
            self.chaos.latency_jitter_ms,
            0,
            MAX_LATENCY_JITTER_MS,
        );
        check_len(
            &mut issues,
            "governance.changeTicket",
            &self.governance.change_ticket,
            MAX_CHANGE_TICKET_LEN,
        );

        check_range(
            &mut issues,
            "aiEnhancement.personalizationDepth",
            self.ai_enhancement.personalization_depth.into(),
            0,
            MAX_PERSONALIZATION_DEPTH.into(),
        );
        if let Some(ref seed) = self.ai_enhancement.seed {
            check_len(&mut issues, "aiEnhancement.seed", seed, MAX_SEED_LEN);
        }
        if let Some(intensity) = self.esg_offset.region_intensity_override {
            check_range(
                &mut issues,
                "esgOffset.regionIntensityOverride",
                intensity.into(),
                1,
                MAX_REGION_INTENSITY.into(),
            );
        }
        check_range(
            &mut issues,
            "moatScore.minimumViableMoat",
            self.moat_score.minimum_viable_moat.into(),
            0,
            MAX_MINIMUM_VIABLE_MOAT.into(),
        );

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Returns the idempotency key the request is delivered under.
    pub fn idempotency_key(&self) -> &str {
        &self.delivery.idempotency_key
    }

    /// Number of metadata entries, zero when metadata is absent.
    pub fn metadata_len(&self) -> usize {
        self.metadata.as_ref().map(BTreeMap::len).unwrap_or(0)
    }

    /// SHA-256 of the canonical JSON of the normalized request.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        common::hash_canonical(self)
    }
}

fn check_len(issues: &mut Vec<ValidationIssue>, path: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len == 0 {
        issues.push(ValidationIssue::new(path, "Must not be empty"));
    } else if len > max {
        issues.push(ValidationIssue::new(
            path,
            format!("Must be at most {max} characters"),
        ));
    }
}

fn check_range(issues: &mut Vec<ValidationIssue>, path: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        issues.push(ValidationIssue::new(
            path,
            format!("Must be between {min} and {max}"),
        ));
    }
}

fn check_region(issues: &mut Vec<ValidationIssue>, path: &str, region: &str) {
    check_len(issues, path, region, MAX_REGION_LEN);
    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        issues.push(ValidationIssue::new(
            path,
            "Region identifiers may only contain lowercase letters, digits and '-'",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_request() -> Value {
        json!({
            "recipient": "World",
            "formality": "formal",
            "locale": "en-US",
            "includeTimestamp": false,
            "policies": {"complianceProfile": "strict-default", "enforceMetadataRules": true},
            "telemetry": {"includeTrace": true, "includePolicyDecisions": true},
            "delivery": {"idempotencyKey": "idem-1", "timeoutMs": 3000, "retryBudget": 2},
            "traceContext": {"correlationId": "corr-1"},
            "routing": {"preferredRegion": "us-east-1", "fallbackRegions": ["eu-west-1"]},
            "saga": {"mode": "always-on", "compensationPolicy": "strict-revert", "persistEveryStep": true},
            "chaos": {"profile": "deterministic", "partitionSimulation": false, "latencyJitterMs": 0},
            "governance": {"changeTicket": "CHG-1", "riskClass": "low"}
        })
    }

    #[test]
    fn parses_valid_request_with_defaults() {
        let request = SagaRequest::parse(&base_request(), &ValidationRules::default()).unwrap();

        assert_eq!(request.formality, Formality::Formal);
        assert_eq!(request.ai_enhancement, AiEnhancementSettings::default());
        assert_eq!(request.esg_offset.provider, EsgProvider::ParodyOffsetsInc);
        assert_eq!(request.moat_score.minimum_viable_moat, 42);
        assert_eq!(request.idempotency_key(), "idem-1");
        assert_eq!(request.metadata_len(), 0);
    }

    #[test]
    fn omitted_sections_fingerprint_like_explicit_defaults() {
        let implicit = SagaRequest::parse(&base_request(), &ValidationRules::default()).unwrap();

        let mut raw = base_request();
        raw["aiEnhancement"] = json!({
            "enabled": true, "profile": "investor-friendly", "personalizationDepth": 2
        });
        raw["esgOffset"] = json!({
            "enabled": true, "targetNetZero": true, "provider": "parody-offsets-inc"
        });
        raw["moatScore"] = json!({
            "enabled": true, "strategy": "narrative-weighted",
            "includeArchitectureTheater": true, "minimumViableMoat": 42
        });
        let explicit = SagaRequest::parse(&raw, &ValidationRules::default()).unwrap();

        assert_eq!(implicit, explicit);
        assert_eq!(implicit.fingerprint().unwrap(), explicit.fingerprint().unwrap());
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let mut raw = base_request();
        raw["surprise"] = json!("ignored");
        let request = SagaRequest::parse(&raw, &ValidationRules::default()).unwrap();
        let reserialized = serde_json::to_value(&request).unwrap();
        assert!(reserialized.get("surprise").is_none());
    }

    #[test]
    fn fingerprint_changes_with_payload() {
        let a = SagaRequest::parse(&base_request(), &ValidationRules::default()).unwrap();
        let mut raw = base_request();
        raw["recipient"] = json!("Board");
        let b = SagaRequest::parse(&raw, &ValidationRules::default()).unwrap();
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let mut raw = base_request();
        raw.as_object_mut().unwrap().remove("recipient");
        let err = SagaRequest::parse(&raw, &ValidationRules::default()).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.issues[0].message.contains("recipient"));
    }

    #[test]
    fn unknown_enum_variant_is_rejected() {
        let mut raw = base_request();
        raw["formality"] = json!("sarcastic");
        assert!(SagaRequest::parse(&raw, &ValidationRules::default()).is_err());
    }

    #[test]
    fn unsupported_locale_is_rejected() {
        let mut raw = base_request();
        raw["locale"] = json!("fr-FR");
        let err = SagaRequest::parse(&raw, &ValidationRules::default()).unwrap_err();
        assert_eq!(err.issues[0].path, "locale");

        let rules = ValidationRules {
            supported_locales: vec!["en-US".to_string(), "fr-FR".to_string()],
        };
        assert!(SagaRequest::parse(&raw, &rules).is_ok());
    }

    #[test]
    fn constraint_violations_are_collected() {
        let mut raw = base_request();
        raw["recipient"] = json!("");
        raw["metadata"] = json!({"bad key!": "v", "ok": ""});
        raw["delivery"]["timeoutMs"] = json!(0);
        raw["routing"]["fallbackRegions"] = json!(["a", "b", "c", "d", "e", "f"]);
        raw["aiEnhancement"] = json!({"personalizationDepth": 9});

        let err = SagaRequest::parse(&raw, &ValidationRules::default()).unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();

        assert!(paths.contains(&"recipient"));
        assert!(paths.contains(&"metadata.bad key!"));
        assert!(paths.contains(&"metadata.ok"));
        assert!(paths.contains(&"delivery.timeoutMs"));
        assert!(paths.contains(&"routing.fallbackRegions"));
        assert!(paths.contains(&"aiEnhancement.personalizationDepth"));
    }

    #[test]
    fn non_object_input_is_rejected() {
        let err = SagaRequest::parse(&json!("hello"), &ValidationRules::default()).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "");
    }
}
