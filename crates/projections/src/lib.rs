//! Projection replay for the saga event log.
//!
//! - [`Projection`] trait for folding events into derived state
//! - [`EventHistogram`], the event-type counter projection
//! - [`ProjectionSnapshot`], the single live, versioned projection
//! - [`ProjectionStore`] backends (in-memory and PostgreSQL)
//! - [`ProjectionReplayService`], which rebuilds the snapshot from scratch

pub mod error;
pub mod histogram;
pub mod memory;
pub mod postgres;
pub mod projection;
pub mod replay;
pub mod snapshot;
pub mod store;

pub use error::{ProjectionError, Result};
pub use histogram::EventHistogram;
pub use memory::InMemoryProjectionStore;
pub use postgres::PostgresProjectionStore;
pub use projection::{Projection, ProjectionPosition};
pub use replay::ProjectionReplayService;
pub use snapshot::ProjectionSnapshot;
pub use store::ProjectionStore;
