//! Deterministic enrichment engines.
//!
//! Each engine is a pure function of its input: identical inputs always
//! produce identical reports, fingerprints and scores.

mod ai;
mod esg;
mod moat;

use serde::{Deserialize, Serialize};

pub use ai::{
    AiEnhancementEngine, AiEnhancementInput, AiEnhancementReport, AiEnhancementResult,
    DETERMINISTIC_MODEL_ID,
};
pub use esg::{EsgOffsetEngine, EsgOffsetInput, EsgOffsetReport};
pub use moat::{MoatAssessment, MoatDimensions, MoatQuartile, MoatScoringEngine, MoatScoringInput};

use crate::request::RiskClass;

/// Sentiment penalty applied to high-risk requests.
const HIGH_RISK_SENTIMENT_PENALTY: i64 = 15;

/// Flattened summary of the three enrichment reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseMetadata {
    pub gen_ai_sentiment_score: u32,
    pub ai_model_id: String,
    pub ai_prompt_fingerprint: String,
    pub ai_token_estimate: u32,
    pub esg_estimated_co2_grams: u64,
    pub esg_offset_purchased_grams: u64,
    pub esg_certificate_id: String,
    pub moat_score: u32,
    pub moat_quartile: MoatQuartile,
}

/// Everything the enrichment pipeline produced for one saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentBundle {
    pub ai_enhancement_report: AiEnhancementReport,
    pub esg_offset_report: EsgOffsetReport,
    pub moat_assessment: MoatAssessment,
    pub enterprise_metadata: EnterpriseMetadata,
}

impl EnrichmentBundle {
    /// Neutral bundle reported when the pipeline never produced one.
    pub fn unavailable() -> Self {
        const UNAVAILABLE: &str = "unavailable";
        Self {
            ai_enhancement_report: AiEnhancementReport {
                enhanced_greeting: "enrichment unavailable".to_string(),
                profile: UNAVAILABLE.to_string(),
                prompt_fingerprint: UNAVAILABLE.to_string(),
                model_id: DETERMINISTIC_MODEL_ID.to_string(),
            },
            esg_offset_report: EsgOffsetReport {
                estimated_co2_grams: 0,
                offset_purchased_grams: 0,
                certificate_id: UNAVAILABLE.to_string(),
                provider: UNAVAILABLE.to_string(),
            },
            moat_assessment: MoatAssessment::neutral(),
            enterprise_metadata: EnterpriseMetadata {
                gen_ai_sentiment_score: 0,
                ai_model_id: DETERMINISTIC_MODEL_ID.to_string(),
                ai_prompt_fingerprint: UNAVAILABLE.to_string(),
                ai_token_estimate: 0,
                esg_estimated_co2_grams: 0,
                esg_offset_purchased_grams: 0,
                esg_certificate_id: UNAVAILABLE.to_string(),
                moat_score: 0,
                moat_quartile: MoatQuartile::Q4,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBucket {
    Low,
    Mid,
    High,
}

impl SentimentBucket {
    pub fn for_score(score: u32) -> Self {
        if score >= 67 {
            SentimentBucket::High
        } else if score >= 34 {
            SentimentBucket::Mid
        } else {
            SentimentBucket::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentBucket::Low => "low",
            SentimentBucket::Mid => "mid",
            SentimentBucket::High => "high",
        }
    }
}

/// Applies the governance risk penalty to a raw sentiment score, clamped to 0..=100.
pub fn adjusted_sentiment(raw: u32, risk_class: RiskClass) -> u32 {
    let penalty = if risk_class == RiskClass::High {
        HIGH_RISK_SENTIMENT_PENALTY
    } else {
        0
    };
    (i64::from(raw) - penalty).clamp(0, 100) as u32
}
