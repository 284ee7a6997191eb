use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::request::AiProfile;

/// Identifier of the deterministic faux-LLM.
pub const DETERMINISTIC_MODEL_ID: &str = "deterministic-faux-llm-v1";

const VALUE_WORDS: [&str; 6] = [
    "synergy",
    "resilience",
    "optionality",
    "governance",
    "leverage",
    "alpha",
];

const DEFAULT_SEED: &str = "default-seed";
const DISABLED: &str = "disabled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiEnhancementInput {
    pub request_id: String,
    pub trace_id: String,
    pub recipient: String,
    pub base_greeting: String,
    pub profile: AiProfile,
    pub personalization_depth: u32,
    pub enabled: bool,
    pub seed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEnhancementReport {
    pub enhanced_greeting: String,
    pub profile: String,
    pub prompt_fingerprint: String,
    pub model_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiEnhancementResult {
    pub report: AiEnhancementReport,
    pub sentiment_score: u32,
    pub token_estimate: u32,
}

/// Appends deterministic "strategic" language to a rendered greeting.
#[derive(Debug, Clone, Copy, Default)]
pub struct AiEnhancementEngine;

impl AiEnhancementEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn enhance(&self, input: &AiEnhancementInput) -> AiEnhancementResult {
        if !input.enabled {
            return AiEnhancementResult {
                report: AiEnhancementReport {
                    enhanced_greeting: format!("{} [ai-enhancement:disabled]", input.base_greeting),
                    profile: DISABLED.to_string(),
                    prompt_fingerprint: DISABLED.to_string(),
                    model_id: DETERMINISTIC_MODEL_ID.to_string(),
                },
                sentiment_score: 0,
                token_estimate: 0,
            };
        }

        let fingerprint = common::hash_string(&common::canonical_json(&json!({
            "requestId": input.request_id,
            "traceId": input.trace_id,
            "recipient": input.recipient,
            "baseGreeting": input.base_greeting,
            "profile": input.profile.as_str(),
            "personalizationDepth": input.personalization_depth,
            "seed": input.seed.as_deref().unwrap_or(DEFAULT_SEED),
        })));
        let signal = common::signal_from_hex(&fingerprint) as usize;

        let emphasis = VALUE_WORDS[signal % VALUE_WORDS.len()];
        let suffix = (0..input.personalization_depth as usize)
            .map(|idx| {
                let word = VALUE_WORDS[(signal + idx) % VALUE_WORDS.len()];
                format!("{word}-{}", idx + 1)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let enhanced_greeting = if suffix.is_empty() {
            format!("{}. Strategic emphasis: {emphasis}.", input.base_greeting)
        } else {
            format!(
                "{}. Strategic emphasis: {emphasis}. Signals: {suffix}.",
                input.base_greeting
            )
        };

        let sentiment_score = (signal % 101) as u32;
        let token_estimate = (enhanced_greeting.chars().count().div_ceil(5)).max(12) as u32;

        AiEnhancementResult {
            report: AiEnhancementReport {
                enhanced_greeting,
                profile: input.profile.as_str().to_string(),
                prompt_fingerprint: fingerprint,
                model_id: DETERMINISTIC_MODEL_ID.to_string(),
            },
            sentiment_score,
            token_estimate,
        }
    }
}
