//! Deterministic fault injection.
//!
//! Every decision is a pure function of `seed:step:attempt`: the same
//! inputs always reproduce the same latency, timeout and partition faults.

use serde::{Deserialize, Serialize};

use crate::steps::SagaStep;

/// One in this many signals triggers a timeout, for any step.
const TIMEOUT_MODULUS: u32 = 23;
/// One in this many signals partitions the routing step.
const PARTITION_MODULUS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaosInput {
    pub seed_base: String,
    pub step: String,
    pub attempt: u32,
    pub partition_simulation: bool,
    pub latency_jitter_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosDecision {
    pub step: String,
    pub deterministic_key: String,
    pub simulated_latency_ms: u64,
    pub injected_faults: Vec<String>,
    pub timeout_triggered: bool,
    pub partition_triggered: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicFaultInjector;

impl DeterministicFaultInjector {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(&self, input: &ChaosInput) -> ChaosDecision {
        let deterministic_key =
            common::hash_string(&format!("{}:{}:{}", input.seed_base, input.step, input.attempt));
        let signal = common::signal_from_hex(&deterministic_key);

        let simulated_latency_ms = if input.latency_jitter_ms == 0 {
            0
        } else {
            u64::from(signal) % (input.latency_jitter_ms + 1)
        };
        let timeout_triggered = signal % TIMEOUT_MODULUS == 0;
        let partition_triggered = input.partition_simulation
            && input.step == SagaStep::RouteRegion.as_str()
            && signal % PARTITION_MODULUS == 0;

        let mut injected_faults = Vec::new();
        if timeout_triggered {
            injected_faults.push(format!("timeout:{}", input.step));
        }
        if partition_triggered {
            injected_faults.push(format!("partition:{}", input.step));
        }
        if simulated_latency_ms > 0 {
            injected_faults.push(format!("latency:{}:{simulated_latency_ms}ms", input.step));
        }

        ChaosDecision {
            step: input.step.clone(),
            deterministic_key,
            simulated_latency_ms,
            injected_faults,
            timeout_triggered,
            partition_triggered,
        }
    }
}
