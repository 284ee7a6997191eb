use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{IdempotencyRecord, Reservation, Result};

/// Storage for idempotency records.
///
/// A key is reserved before its saga runs, so concurrent deliveries of one
/// key observe the reservation instead of starting a saga of their own.
/// Completed records are immutable.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Looks up the record stored under `key`.
    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>>;

    /// Atomically reserves `key` for a delivery fingerprinted as
    /// `request_hash`.
    ///
    /// Returns [`Reservation::Existing`] when another delivery holds the
    /// key, unless its record is still pending after `stale_after`, in
    /// which case the reservation is taken over.
    async fn reserve(
        &self,
        key: &str,
        request_hash: &str,
        stale_after: Duration,
    ) -> Result<Reservation>;

    /// Stores the response for a reservation made with the same hash.
    ///
    /// Fails with [`ReservationLost`](crate::IdempotencyError::ReservationLost)
    /// if the reservation no longer exists or was already completed.
    async fn complete(&self, key: &str, request_hash: &str, response: Value) -> Result<()>;

    /// Drops a pending reservation so the key can be delivered again.
    /// Completed records are left untouched.
    async fn release(&self, key: &str) -> Result<()>;
}
