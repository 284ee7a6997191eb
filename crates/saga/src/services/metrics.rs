//! Named counters for saga and request telemetry.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::{read, write};

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Returns a counter's value, zero when it was never incremented.
    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}

pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, amount: u64);

    fn snapshot(&self) -> MetricsSnapshot;
}

/// Counter store that also forwards every increment to the `metrics` facade,
/// so whichever recorder the binary installs sees the same counters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetrics {
    counters: Arc<RwLock<BTreeMap<String, u64>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, name: &str, amount: u64) {
        *write(&self.counters).entry(name.to_string()).or_insert(0) += amount;
        metrics::counter!(name.to_string()).increment(amount);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: read(&self.counters).clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate() {
        let metrics = InMemoryMetrics::new();
        metrics.increment("requests_total", 1);
        metrics.increment("requests_total", 1);
        metrics.increment("latency_ms_total", 40);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.get("requests_total"), 2);
        assert_eq!(snapshot.get("latency_ms_total"), 40);
        assert_eq!(snapshot.get("missing_total"), 0);
    }

    #[test]
    fn clones_share_counters() {
        let metrics = InMemoryMetrics::new();
        let clone = metrics.clone();
        clone.increment("saga_completed_total", 1);
        assert_eq!(metrics.snapshot().get("saga_completed_total"), 1);
    }

    #[test]
    fn snapshot_serializes_as_counters_map() {
        let metrics = InMemoryMetrics::new();
        metrics.increment("a_total", 3);
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json, serde_json::json!({"counters": {"a_total": 3}}));
    }
}
