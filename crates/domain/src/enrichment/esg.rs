use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::request::EsgProvider;

const DEFAULT_REGION_INTENSITY: u32 = 350;

fn region_intensity(region: &str) -> u32 {
    match region {
        "us-east-1" => 410,
        "eu-west-1" => 220,
        _ => DEFAULT_REGION_INTENSITY,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsgOffsetInput {
    pub request_id: String,
    pub saga_id: String,
    pub selected_region: String,
    /// Length of the enhanced greeting, in characters.
    pub greeting_length: usize,
    pub enabled: bool,
    pub target_net_zero: bool,
    pub provider: EsgProvider,
    pub region_intensity_override: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsgOffsetReport {
    pub estimated_co2_grams: u64,
    pub offset_purchased_grams: u64,
    pub certificate_id: String,
    pub provider: String,
}

/// Estimates the carbon footprint of a greeting and buys a synthetic offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct EsgOffsetEngine;

impl EsgOffsetEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, input: &EsgOffsetInput) -> EsgOffsetReport {
        if !input.enabled {
            return EsgOffsetReport {
                estimated_co2_grams: 0,
                offset_purchased_grams: 0,
                certificate_id: "disabled".to_string(),
                provider: "disabled".to_string(),
            };
        }

        let intensity = input
            .region_intensity_override
            .unwrap_or_else(|| region_intensity(&input.selected_region));
        let estimated = (input.greeting_length as f64 * f64::from(intensity) / 100.0).max(1.0);
        let estimated_co2_grams = estimated.round() as u64;
        let offset_purchased_grams = if input.target_net_zero {
            estimated_co2_grams
        } else {
            (estimated_co2_grams as f64 * 0.5).round() as u64
        };

        let certificate = common::hash_string(&common::canonical_json(&json!({
            "requestId": input.request_id,
            "sagaId": input.saga_id,
            "selectedRegion": input.selected_region,
            "estimatedCo2Grams": estimated_co2_grams,
            "offsetPurchasedGrams": offset_purchased_grams,
            "provider": input.provider.as_str(),
        })));

        EsgOffsetReport {
            estimated_co2_grams,
            offset_purchased_grams,
            certificate_id: format!("esg-{}", &certificate[..16]),
            provider: input.provider.as_str().to_string(),
        }
    }
}
