//! Append-only event log for saga executions.
//!
//! Every saga step transition is recorded as a [`SagaEvent`] with a
//! monotonically increasing, 1-based [`Offset`]. The log is the source of
//! truth for projection replay and saga history reconstruction.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{SagaId, TraceId};
pub use error::{EventStoreError, Result};
pub use event::{EventType, NewSagaEvent, Offset, SagaEvent, SagaEventBuilder};
pub use memory::InMemoryEventLog;
pub use postgres::PostgresEventLog;
pub use query::EventQuery;
pub use store::{EventLog, EventLogExt, EventStream};
