//! Shared types for the saga orchestration core.
//!
//! - [`SagaId`] and [`TraceId`] newtypes over UUIDs
//! - [`ErrorCode`], the stable failure taxonomy surfaced to callers
//! - [`hash`] helpers for canonical JSON and SHA-256 fingerprints

pub mod codes;
pub mod hash;
pub mod types;

pub use codes::ErrorCode;
pub use hash::{canonical_json, canonicalize, hash_canonical, hash_string, signal_from_hex};
pub use types::{SagaId, TraceId};
