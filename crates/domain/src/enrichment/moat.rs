use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::request::MoatStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoatQuartile {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl MoatQuartile {
    pub fn for_score(score: u32) -> Self {
        match score {
            75.. => MoatQuartile::Q1,
            50..=74 => MoatQuartile::Q2,
            25..=49 => MoatQuartile::Q3,
            _ => MoatQuartile::Q4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoatDimensions {
    pub narrative: u32,
    pub complexity: u32,
    pub defensibility: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoatAssessment {
    pub score: u32,
    pub quartile: MoatQuartile,
    pub dimensions: MoatDimensions,
}

impl MoatAssessment {
    /// Zero score in the bottom quartile.
    pub fn neutral() -> Self {
        Self {
            score: 0,
            quartile: MoatQuartile::Q4,
            dimensions: MoatDimensions {
                narrative: 0,
                complexity: 0,
                defensibility: 0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoatScoringInput {
    pub request_id: String,
    pub saga_id: String,
    pub strategy: MoatStrategy,
    pub include_architecture_theater: bool,
    pub minimum_viable_moat: u32,
    /// Number of events in the log when scoring ran.
    pub event_volume: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoatScoringEngine;

fn scaled(value: f64, factor: f64) -> u32 {
    (value * factor).round().clamp(0.0, 100.0) as u32
}

impl MoatScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, input: &MoatScoringInput) -> MoatAssessment {
        if !input.enabled {
            return MoatAssessment::neutral();
        }

        let fingerprint = common::hash_string(&common::canonical_json(&json!({
            "requestId": input.request_id,
            "sagaId": input.saga_id,
            "strategy": input.strategy.as_str(),
            "includeArchitectureTheater": input.include_architecture_theater,
            "minimumViableMoat": input.minimum_viable_moat,
            "eventVolume": input.event_volume,
        })));
        let signal = common::signal_from_hex(&fingerprint);

        let complexity_boost = if input.include_architecture_theater { 18 } else { 4 };
        let strategy_bias = match input.strategy {
            MoatStrategy::ComplexityMax => 14,
            MoatStrategy::NarrativeWeighted => 7,
        };
        let raw = signal % 45 + input.minimum_viable_moat + complexity_boost + strategy_bias;
        let score = raw.min(100);

        MoatAssessment {
            score,
            quartile: MoatQuartile::for_score(score),
            dimensions: MoatDimensions {
                narrative: scaled(f64::from(score), 0.9),
                complexity: scaled(f64::from(score), 1.05),
                defensibility: scaled(f64::from(score) + input.event_volume as f64, 0.8),
            },
        }
    }
}
