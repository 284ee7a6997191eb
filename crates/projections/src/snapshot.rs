use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// The single live projection over the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSnapshot {
    /// Incremented on every replay, starting from 0 before the first one.
    pub projection_version: u64,
    /// Number of events folded into `counters`.
    pub replay_checkpoint: u64,
    pub replay_duration_ms: u64,
    /// SHA-256 over the checkpoint and counters; empty before the first replay.
    pub checksum: String,
    pub counters: BTreeMap<String, u64>,
}

impl ProjectionSnapshot {
    /// The snapshot stored before any replay has run.
    pub fn initial() -> Self {
        Self {
            projection_version: 0,
            replay_checkpoint: 0,
            replay_duration_ms: 0,
            checksum: String::new(),
            counters: BTreeMap::new(),
        }
    }

    /// Deterministic checksum of a checkpoint and its counters.
    pub fn compute_checksum(
        replay_checkpoint: u64,
        counters: &BTreeMap<String, u64>,
    ) -> Result<String, serde_json::Error> {
        common::hash_canonical(&json!({
            "replayCheckpoint": replay_checkpoint,
            "counters": counters,
        }))
    }
}

impl Default for ProjectionSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_depends_on_checkpoint_and_counters() {
        let mut counters = BTreeMap::new();
        counters.insert("event_step_completed_total".to_string(), 3);

        let a = ProjectionSnapshot::compute_checksum(3, &counters).unwrap();
        let b = ProjectionSnapshot::compute_checksum(3, &counters).unwrap();
        let c = ProjectionSnapshot::compute_checksum(4, &counters).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn initial_snapshot_wire_shape() {
        let json = serde_json::to_value(ProjectionSnapshot::initial()).unwrap();
        assert_eq!(json["projectionVersion"], 0);
        assert_eq!(json["replayCheckpoint"], 0);
        assert_eq!(json["checksum"], "");
        assert_eq!(json["counters"], json!({}));
    }
}
