use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    IdempotencyError, IdempotencyRecord, Reservation, Result, store::IdempotencyStore,
};

/// In-memory idempotency ledger.
#[derive(Clone, Default)]
pub struct InMemoryIdempotencyStore {
    records: Arc<RwLock<HashMap<String, IdempotencyRecord>>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded keys, pending ones included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    #[tracing::instrument(skip(self, request_hash))]
    async fn reserve(
        &self,
        key: &str,
        request_hash: &str,
        stale_after: Duration,
    ) -> Result<Reservation> {
        let mut records = self.records.write().await;
        match records.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(IdempotencyRecord::pending(key, request_hash));
                Ok(Reservation::Acquired)
            }
            Entry::Occupied(mut slot) => {
                if slot.get().is_stale(stale_after, Utc::now()) {
                    tracing::warn!("Taking over stale idempotency reservation");
                    slot.insert(IdempotencyRecord::pending(key, request_hash));
                    Ok(Reservation::Acquired)
                } else {
                    Ok(Reservation::Existing(slot.get().clone()))
                }
            }
        }
    }

    #[tracing::instrument(skip(self, request_hash, response))]
    async fn complete(&self, key: &str, request_hash: &str, response: Value) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get_mut(key) {
            Some(record) if record.is_pending() && record.request_hash == request_hash => {
                record.response = Some(response);
                metrics::counter!("idempotency_records_total").increment(1);
                Ok(())
            }
            _ => Err(IdempotencyError::ReservationLost(key.to_string())),
        }
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut records = self.records.write().await;
        if records.get(key).is_some_and(IdempotencyRecord::is_pending) {
            records.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReplayDecision;
    use serde_json::json;

    const STALE_AFTER: Duration = Duration::from_secs(120);

    #[tokio::test]
    async fn reserve_complete_then_find() {
        let store = InMemoryIdempotencyStore::new();
        assert!(store.find("k1").await.unwrap().is_none());

        let reservation = store.reserve("k1", "hash", STALE_AFTER).await.unwrap();
        assert_eq!(reservation, Reservation::Acquired);
        assert!(store.find("k1").await.unwrap().unwrap().is_pending());

        store
            .complete("k1", "hash", json!({"status": "ok"}))
            .await
            .unwrap();

        let record = store.find("k1").await.unwrap().unwrap();
        assert_eq!(record.request_hash, "hash");
        assert_eq!(record.response, Some(json!({"status": "ok"})));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn second_reservation_sees_the_first() {
        let store = InMemoryIdempotencyStore::new();
        store.reserve("k1", "first", STALE_AFTER).await.unwrap();

        let Reservation::Existing(record) =
            store.reserve("k1", "first", STALE_AFTER).await.unwrap()
        else {
            panic!("expected the existing reservation");
        };
        assert_eq!(record.decide("first"), ReplayDecision::Pending);
        assert_eq!(record.decide("second"), ReplayDecision::Conflict);

        store.complete("k1", "first", json!(1)).await.unwrap();
        let Reservation::Existing(record) =
            store.reserve("k1", "first", STALE_AFTER).await.unwrap()
        else {
            panic!("expected the completed record");
        };
        assert_eq!(record.decide("first"), ReplayDecision::Deduplicate(json!(1)));
    }

    #[tokio::test]
    async fn completed_records_are_immutable() {
        let store = InMemoryIdempotencyStore::new();
        store.reserve("k1", "h", STALE_AFTER).await.unwrap();
        store.complete("k1", "h", json!(1)).await.unwrap();

        let again = store.complete("k1", "h", json!(2)).await;
        assert!(matches!(again, Err(IdempotencyError::ReservationLost(ref k)) if k == "k1"));

        store.release("k1").await.unwrap();
        let record = store.find("k1").await.unwrap().unwrap();
        assert_eq!(record.response, Some(json!(1)));
    }

    #[tokio::test]
    async fn released_reservation_can_be_taken_again() {
        let store = InMemoryIdempotencyStore::new();
        store.reserve("k1", "h", STALE_AFTER).await.unwrap();
        store.release("k1").await.unwrap();
        assert!(store.is_empty().await);

        let lost = store.complete("k1", "h", json!(1)).await;
        assert!(matches!(lost, Err(IdempotencyError::ReservationLost(_))));
        assert_eq!(
            store.reserve("k1", "h", STALE_AFTER).await.unwrap(),
            Reservation::Acquired
        );
    }

    #[tokio::test]
    async fn stale_reservation_is_taken_over() {
        let store = InMemoryIdempotencyStore::new();
        store.reserve("k1", "old", STALE_AFTER).await.unwrap();

        let reservation = store.reserve("k1", "new", Duration::ZERO).await.unwrap();
        assert_eq!(reservation, Reservation::Acquired);
        assert_eq!(store.find("k1").await.unwrap().unwrap().request_hash, "new");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_have_one_owner() {
        let store = InMemoryIdempotencyStore::new();
        let barrier = Arc::new(tokio::sync::Barrier::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                store.reserve("shared", "h", STALE_AFTER).await.unwrap() == Reservation::Acquired
            }));
        }

        let mut owners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                owners += 1;
            }
        }
        assert_eq!(owners, 1);
        assert_eq!(store.len().await, 1);
    }
}
