//! Idempotency key ledger.
//!
//! Each delivered request is recorded under its idempotency key together
//! with the fingerprint of the normalized request and the response that was
//! returned. The key is reserved before any work starts: of two concurrent
//! deliveries exactly one gets [`Reservation::Acquired`], the other sees the
//! pending record and waits for its response.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use error::{IdempotencyError, Result};
pub use memory::InMemoryIdempotencyStore;
pub use postgres::PostgresIdempotencyStore;
pub use record::{IdempotencyRecord, ReplayDecision, Reservation};
pub use store::IdempotencyStore;
