//! Domain layer for the saga orchestration core.
//!
//! This crate holds everything that is pure and deterministic:
//! - [`SagaRequest`], its defaults and validation rules
//! - [`PolicyGate`] and the strict-default policy
//! - Greeting strategies selected by formality
//! - AI enhancement, ESG offset and moat scoring engines
//! - The deterministic runbook generator

pub mod enrichment;
pub mod error;
pub mod greeting;
pub mod policy;
pub mod request;
pub mod runbook;

pub use enrichment::{
    AiEnhancementEngine, AiEnhancementInput, AiEnhancementReport, AiEnhancementResult,
    DETERMINISTIC_MODEL_ID, EnrichmentBundle, EnterpriseMetadata, EsgOffsetEngine,
    EsgOffsetInput, EsgOffsetReport, MoatAssessment, MoatDimensions, MoatQuartile,
    MoatScoringEngine, MoatScoringInput, SentimentBucket, adjusted_sentiment,
};
pub use error::{ValidationError, ValidationIssue};
pub use greeting::{ENTERPRISE_EDITION, GreetingStrategy, strategy_for};
pub use policy::{
    DEFAULT_MAX_METADATA_ENTRIES, PolicyEvaluation, PolicyGate, PolicyOutcome, StrictDefaultPolicy,
};
pub use request::{
    AiEnhancementSettings, AiProfile, ChaosSettings, DeliverySettings, EsgOffsetSettings,
    EsgProvider, Formality, GovernanceSettings, MoatScoreSettings, MoatStrategy, PolicySettings,
    RiskClass, RoutingSettings, SagaRequest, SagaSettings, TelemetrySettings, TraceContext,
    ValidationRules,
};
pub use runbook::{RUNBOOK_GENERATOR_ID, RunbookGenerationEngine, RunbookPlan, Severity};
