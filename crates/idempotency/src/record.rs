use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The stored outcome of one delivered request.
///
/// A record is created `pending` (no response) when a delivery reserves its
/// key, and completed once the saga's response is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyRecord {
    pub key: String,
    /// SHA-256 of the canonical JSON of the normalized request.
    pub request_hash: String,
    /// The full response returned the first time the key was delivered.
    pub response: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// What to do with a request whose key is already recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayDecision {
    /// Same payload: return the stored response.
    Deduplicate(Value),
    /// Same payload, but the first delivery is still running.
    Pending,
    /// Different payload under a reused key.
    Conflict,
}

/// Result of trying to reserve a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    /// The caller owns the key and must `complete` or `release` it.
    Acquired,
    /// Another delivery holds the key.
    Existing(IdempotencyRecord),
}

impl IdempotencyRecord {
    /// A completed record.
    pub fn new(key: impl Into<String>, request_hash: impl Into<String>, response: Value) -> Self {
        Self {
            key: key.into(),
            request_hash: request_hash.into(),
            response: Some(response),
            created_at: Utc::now(),
        }
    }

    /// A reservation whose response is not known yet.
    pub fn pending(key: impl Into<String>, request_hash: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            request_hash: request_hash.into(),
            response: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.response.is_none()
    }

    /// True for a pending record older than `stale_after`, whose owner is
    /// presumed gone.
    pub fn is_stale(&self, stale_after: Duration, now: DateTime<Utc>) -> bool {
        let window = TimeDelta::from_std(stale_after).unwrap_or(TimeDelta::MAX);
        self.is_pending() && now - self.created_at >= window
    }

    /// Compares a new delivery's fingerprint against the stored one.
    pub fn decide(&self, request_hash: &str) -> ReplayDecision {
        if self.request_hash != request_hash {
            return ReplayDecision::Conflict;
        }
        match &self.response {
            Some(response) => ReplayDecision::Deduplicate(response.clone()),
            None => ReplayDecision::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matching_hash_deduplicates() {
        let record = IdempotencyRecord::new("k", "abc", json!({"ok": true}));
        assert_eq!(
            record.decide("abc"),
            ReplayDecision::Deduplicate(json!({"ok": true}))
        );
        assert_eq!(record.decide("def"), ReplayDecision::Conflict);
    }

    #[test]
    fn pending_record_waits_or_conflicts() {
        let record = IdempotencyRecord::pending("k", "abc");
        assert!(record.is_pending());
        assert_eq!(record.decide("abc"), ReplayDecision::Pending);
        assert_eq!(record.decide("def"), ReplayDecision::Conflict);
    }

    #[test]
    fn only_old_pending_records_are_stale() {
        let pending = IdempotencyRecord::pending("k", "abc");
        let later = pending.created_at + TimeDelta::seconds(10);
        assert!(!pending.is_stale(Duration::from_secs(30), later));
        assert!(pending.is_stale(Duration::from_secs(5), later));

        let done = IdempotencyRecord::new("k", "abc", json!(1));
        assert!(!done.is_stale(Duration::ZERO, later));
    }
}
