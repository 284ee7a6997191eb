use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{EventQuery, NewSagaEvent, Offset, Result, SagaEvent, SagaId};

/// A stream of events in ascending offset order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SagaEvent>> + Send>>;

/// Core trait for event log implementations.
///
/// The log is append-only: events are never updated or deleted, and offsets
/// are assigned by the log in strictly increasing order. All implementations
/// must be thread-safe (Send + Sync) so concurrent sagas can share one log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Appends one event and returns the offset it was assigned.
    async fn append(&self, event: NewSagaEvent) -> Result<Offset>;

    /// Returns the number of events in the log.
    async fn count(&self) -> Result<u64>;

    /// Returns the offset of the most recent event, or [`Offset::initial`]
    /// when the log is empty.
    async fn latest_offset(&self) -> Result<Offset>;

    /// Returns every event in ascending offset order.
    async fn replay_all(&self) -> Result<Vec<SagaEvent>>;

    /// Streams every event in ascending offset order.
    async fn stream_all(&self) -> Result<EventStream>;

    /// Returns up to `limit` of the most recent events, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<SagaEvent>>;

    /// Returns events matching a query, in ascending offset order.
    async fn query(&self, query: EventQuery) -> Result<Vec<SagaEvent>>;
}

/// Extension trait providing convenience methods for event logs.
#[async_trait]
pub trait EventLogExt: EventLog {
    /// Returns every event recorded for one saga execution.
    async fn events_for_saga(&self, saga_id: SagaId) -> Result<Vec<SagaEvent>> {
        self.query(EventQuery::for_saga(saga_id)).await
    }

    /// Returns true if no event has been appended yet.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.latest_offset().await? == Offset::initial())
    }
}

// Blanket implementation for all EventLog implementations
impl<T: EventLog + ?Sized> EventLogExt for T {}
