//! Enrichment pipeline: runs the AI, ESG and moat engines for a rendered
//! greeting and persists their artifacts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SagaId;
use domain::{
    AiEnhancementEngine, AiEnhancementInput, EnrichmentBundle, EnterpriseMetadata,
    EsgOffsetEngine, EsgOffsetInput, MoatDimensions, MoatQuartile, MoatScoringEngine,
    MoatScoringInput, SagaRequest, SentimentBucket, adjusted_sentiment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metrics::MetricsSink;
use super::{read, write};

/// Saga state the enrichment engines are keyed on.
#[derive(Debug, Clone)]
pub struct EnrichmentContext {
    pub request_id: String,
    pub trace_id: String,
    pub saga_id: SagaId,
    pub selected_region: String,
    pub base_greeting: String,
    /// Number of events in the log when the pipeline started.
    pub event_volume: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    #[error("{0}")]
    Pipeline(String),

    #[error("{0}")]
    Persist(String),
}

#[async_trait]
pub trait EnrichmentPipeline: Send + Sync {
    async fn run(
        &self,
        request: &SagaRequest,
        ctx: &EnrichmentContext,
    ) -> Result<EnrichmentBundle, EnrichmentError>;

    async fn persist(
        &self,
        request: &SagaRequest,
        ctx: &EnrichmentContext,
        bundle: &EnrichmentBundle,
    ) -> Result<(), EnrichmentError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEnrichmentRecord {
    pub request_id: String,
    pub saga_id: SagaId,
    pub trace_id: String,
    pub profile: String,
    pub model_id: String,
    pub prompt_fingerprint: String,
    pub enhanced_greeting: String,
    pub sentiment_score: u32,
    pub token_estimate: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsgOffsetRecord {
    pub request_id: String,
    pub saga_id: SagaId,
    pub provider: String,
    pub estimated_co2_grams: u64,
    pub offset_purchased_grams: u64,
    pub certificate_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoatAssessmentRecord {
    pub request_id: String,
    pub saga_id: SagaId,
    pub strategy: String,
    pub score: u32,
    pub quartile: MoatQuartile,
    pub dimensions: MoatDimensions,
    pub created_at: DateTime<Utc>,
}

/// Durable artifacts written by [`EnrichmentPipeline::persist`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentLedgers {
    pub ai_enrichments: Vec<AiEnrichmentRecord>,
    pub esg_offsets: Vec<EsgOffsetRecord>,
    pub moat_assessments: Vec<MoatAssessmentRecord>,
}

/// Pipeline backed by the deterministic engines and in-memory ledgers.
pub struct DeterministicEnrichmentPipeline {
    ai: AiEnhancementEngine,
    esg: EsgOffsetEngine,
    moat: MoatScoringEngine,
    ledgers: RwLock<EnrichmentLedgers>,
    metrics: Arc<dyn MetricsSink>,
    fail_on_run: AtomicBool,
    fail_on_persist: AtomicBool,
}

impl DeterministicEnrichmentPipeline {
    pub fn new(metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            ai: AiEnhancementEngine::new(),
            esg: EsgOffsetEngine::new(),
            moat: MoatScoringEngine::new(),
            ledgers: RwLock::new(EnrichmentLedgers::default()),
            metrics,
            fail_on_run: AtomicBool::new(false),
            fail_on_persist: AtomicBool::new(false),
        }
    }

    /// Makes every following `run` call fail.
    pub fn set_fail_on_run(&self, fail: bool) {
        self.fail_on_run.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `persist` call fail.
    pub fn set_fail_on_persist(&self, fail: bool) {
        self.fail_on_persist.store(fail, Ordering::SeqCst);
    }

    pub fn ledgers(&self) -> EnrichmentLedgers {
        read(&self.ledgers).clone()
    }
}

#[async_trait]
impl EnrichmentPipeline for DeterministicEnrichmentPipeline {
    #[tracing::instrument(skip_all, fields(saga_id = %ctx.saga_id))]
    async fn run(
        &self,
        request: &SagaRequest,
        ctx: &EnrichmentContext,
    ) -> Result<EnrichmentBundle, EnrichmentError> {
        if self.fail_on_run.load(Ordering::SeqCst) {
            return Err(EnrichmentError::Pipeline(
                "AI enhancement engine unavailable".to_string(),
            ));
        }

        let settings = &request.ai_enhancement;
        let ai = self.ai.enhance(&AiEnhancementInput {
            request_id: ctx.request_id.clone(),
            trace_id: ctx.trace_id.clone(),
            recipient: request.recipient.clone(),
            base_greeting: ctx.base_greeting.clone(),
            profile: settings.profile,
            personalization_depth: settings.personalization_depth,
            enabled: settings.enabled,
            seed: settings.seed.clone(),
        });
        let sentiment = adjusted_sentiment(ai.sentiment_score, request.governance.risk_class);

        let esg = self.esg.calculate(&EsgOffsetInput {
            request_id: ctx.request_id.clone(),
            saga_id: ctx.saga_id.to_string(),
            selected_region: ctx.selected_region.clone(),
            greeting_length: ai.report.enhanced_greeting.chars().count(),
            enabled: request.esg_offset.enabled,
            target_net_zero: request.esg_offset.target_net_zero,
            provider: request.esg_offset.provider,
            region_intensity_override: request.esg_offset.region_intensity_override,
        });

        let moat = self.moat.assess(&MoatScoringInput {
            request_id: ctx.request_id.clone(),
            saga_id: ctx.saga_id.to_string(),
            strategy: request.moat_score.strategy,
            include_architecture_theater: request.moat_score.include_architecture_theater,
            minimum_viable_moat: request.moat_score.minimum_viable_moat,
            event_volume: ctx.event_volume,
            enabled: request.moat_score.enabled,
        });

        let enterprise_metadata = EnterpriseMetadata {
            gen_ai_sentiment_score: sentiment,
            ai_model_id: ai.report.model_id.clone(),
            ai_prompt_fingerprint: ai.report.prompt_fingerprint.clone(),
            ai_token_estimate: ai.token_estimate,
            esg_estimated_co2_grams: esg.estimated_co2_grams,
            esg_offset_purchased_grams: esg.offset_purchased_grams,
            esg_certificate_id: esg.certificate_id.clone(),
            moat_score: moat.score,
            moat_quartile: moat.quartile,
        };

        Ok(EnrichmentBundle {
            ai_enhancement_report: ai.report,
            esg_offset_report: esg,
            moat_assessment: moat,
            enterprise_metadata,
        })
    }

    #[tracing::instrument(skip_all, fields(saga_id = %ctx.saga_id))]
    async fn persist(
        &self,
        request: &SagaRequest,
        ctx: &EnrichmentContext,
        bundle: &EnrichmentBundle,
    ) -> Result<(), EnrichmentError> {
        if self.fail_on_persist.load(Ordering::SeqCst) {
            return Err(EnrichmentError::Persist(
                "ESG ledger rejected the write".to_string(),
            ));
        }

        let now = Utc::now();
        let ai = &bundle.ai_enhancement_report;
        let esg = &bundle.esg_offset_report;
        let moat = &bundle.moat_assessment;
        let sentiment = bundle.enterprise_metadata.gen_ai_sentiment_score;

        {
            let mut ledgers = write(&self.ledgers);
            ledgers.ai_enrichments.push(AiEnrichmentRecord {
                request_id: ctx.request_id.clone(),
                saga_id: ctx.saga_id,
                trace_id: ctx.trace_id.clone(),
                profile: ai.profile.clone(),
                model_id: ai.model_id.clone(),
                prompt_fingerprint: ai.prompt_fingerprint.clone(),
                enhanced_greeting: ai.enhanced_greeting.clone(),
                sentiment_score: sentiment,
                token_estimate: bundle.enterprise_metadata.ai_token_estimate,
                created_at: now,
            });
            ledgers.esg_offsets.push(EsgOffsetRecord {
                request_id: ctx.request_id.clone(),
                saga_id: ctx.saga_id,
                provider: esg.provider.clone(),
                estimated_co2_grams: esg.estimated_co2_grams,
                offset_purchased_grams: esg.offset_purchased_grams,
                certificate_id: esg.certificate_id.clone(),
                created_at: now,
            });
            ledgers.moat_assessments.push(MoatAssessmentRecord {
                request_id: ctx.request_id.clone(),
                saga_id: ctx.saga_id,
                strategy: request.moat_score.strategy.as_str().to_string(),
                score: moat.score,
                quartile: moat.quartile,
                dimensions: moat.dimensions,
                created_at: now,
            });
        }

        self.metrics.increment("ai_enrichment_total", 1);
        self.metrics.increment("esg_offset_total", 1);
        self.metrics.increment("moat_assessment_total", 1);
        self.metrics
            .increment("esg_offset_grams_total", esg.offset_purchased_grams);
        self.metrics.increment(
            &format!("sentiment_{}_total", SentimentBucket::for_score(sentiment).as_str()),
            1,
        );
        if !request.ai_enhancement.enabled {
            self.metrics.increment("ai_enrichment_disabled_total", 1);
        }
        if !request.esg_offset.enabled {
            self.metrics.increment("esg_offset_disabled_total", 1);
        }
        if !request.moat_score.enabled {
            self.metrics.increment("moat_assessment_disabled_total", 1);
        }

        tracing::debug!(certificate_id = %esg.certificate_id, "Enrichment artifacts persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::metrics::InMemoryMetrics;
    use domain::{RiskClass, ValidationRules};
    use serde_json::json;

    fn request(risk: &str, ai_enabled: bool) -> SagaRequest {
        let raw = json!({
            "recipient": "World",
            "formality": "formal",
            "locale": "en-US",
            "policies": {"complianceProfile": "strict-default", "enforceMetadataRules": true},
            "telemetry": {"includeTrace": true, "includePolicyDecisions": true},
            "delivery": {"idempotencyKey": "k-1", "timeoutMs": 1000, "retryBudget": 0},
            "routing": {"preferredRegion": "eu-west-1"},
            "governance": {"changeTicket": "CHG-1", "riskClass": risk},
            "aiEnhancement": {"enabled": ai_enabled}
        });
        SagaRequest::parse(&raw, &ValidationRules::default()).unwrap()
    }

    fn context() -> EnrichmentContext {
        EnrichmentContext {
            request_id: "req-1".to_string(),
            trace_id: "trace-1".to_string(),
            saga_id: SagaId::new(),
            selected_region: "eu-west-1".to_string(),
            base_greeting: "Greetings, World".to_string(),
            event_volume: 3,
        }
    }

    #[tokio::test]
    async fn run_is_deterministic() {
        let pipeline = DeterministicEnrichmentPipeline::new(Arc::new(InMemoryMetrics::new()));
        let request = request("low", true);
        let ctx = context();

        let first = pipeline.run(&request, &ctx).await.unwrap();
        let second = pipeline.run(&request, &ctx).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.enterprise_metadata.ai_prompt_fingerprint,
            first.ai_enhancement_report.prompt_fingerprint
        );
        assert_eq!(first.enterprise_metadata.moat_score, first.moat_assessment.score);
    }

    #[tokio::test]
    async fn high_risk_lowers_sentiment() {
        let pipeline = DeterministicEnrichmentPipeline::new(Arc::new(InMemoryMetrics::new()));
        let ctx = context();

        let low = pipeline.run(&request("low", true), &ctx).await.unwrap();
        let high = pipeline.run(&request("high", true), &ctx).await.unwrap();

        let raw = low.enterprise_metadata.gen_ai_sentiment_score;
        assert_eq!(
            high.enterprise_metadata.gen_ai_sentiment_score,
            adjusted_sentiment(raw, RiskClass::High)
        );
    }

    #[tokio::test]
    async fn persist_writes_ledgers_and_metrics() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let pipeline = DeterministicEnrichmentPipeline::new(metrics.clone());
        let request = request("medium", false);
        let ctx = context();

        let bundle = pipeline.run(&request, &ctx).await.unwrap();
        pipeline.persist(&request, &ctx, &bundle).await.unwrap();

        let ledgers = pipeline.ledgers();
        assert_eq!(ledgers.ai_enrichments.len(), 1);
        assert_eq!(ledgers.esg_offsets.len(), 1);
        assert_eq!(ledgers.moat_assessments[0].strategy, "narrative-weighted");
        assert_eq!(ledgers.ai_enrichments[0].profile, "disabled");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.get("ai_enrichment_total"), 1);
        assert_eq!(snapshot.get("ai_enrichment_disabled_total"), 1);
        assert_eq!(snapshot.get("esg_offset_disabled_total"), 0);
        assert_eq!(
            snapshot.get("esg_offset_grams_total"),
            bundle.esg_offset_report.offset_purchased_grams
        );
        // Disabled AI reports zero sentiment.
        assert_eq!(snapshot.get("sentiment_low_total"), 1);
    }

    #[tokio::test]
    async fn failure_toggles() {
        let pipeline = DeterministicEnrichmentPipeline::new(Arc::new(InMemoryMetrics::new()));
        let request = request("low", true);
        let ctx = context();

        pipeline.set_fail_on_run(true);
        assert!(matches!(
            pipeline.run(&request, &ctx).await,
            Err(EnrichmentError::Pipeline(_))
        ));

        pipeline.set_fail_on_run(false);
        let bundle = pipeline.run(&request, &ctx).await.unwrap();
        pipeline.set_fail_on_persist(true);
        assert!(matches!(
            pipeline.persist(&request, &ctx, &bundle).await,
            Err(EnrichmentError::Persist(_))
        ));
        assert!(pipeline.ledgers().ai_enrichments.is_empty());
    }
}
