use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventQuery, NewSagaEvent, Offset, Result, SagaEvent,
    store::{EventLog, EventStream},
};

/// In-memory event log.
///
/// Offsets are assigned under the write lock, so they are dense, start at 1
/// and are visible to readers in append order.
#[derive(Clone, Default)]
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<SagaEvent>>>,
}

impl InMemoryEventLog {
    /// Creates a new empty in-memory event log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    #[tracing::instrument(skip(self, event), fields(step = %event.step, event_type = %event.event_type))]
    async fn append(&self, event: NewSagaEvent) -> Result<Offset> {
        let mut events = self.events.write().await;
        let offset = events
            .last()
            .map(|e| e.offset.next())
            .unwrap_or(Offset::first());
        events.push(event.into_event(offset));
        metrics::counter!("event_log_appends_total").increment(1);
        Ok(offset)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.events.read().await.len() as u64)
    }

    async fn latest_offset(&self) -> Result<Offset> {
        Ok(self
            .events
            .read()
            .await
            .last()
            .map(|e| e.offset)
            .unwrap_or(Offset::initial()))
    }

    async fn replay_all(&self) -> Result<Vec<SagaEvent>> {
        Ok(self.events.read().await.clone())
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.events.read().await.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<SagaEvent>> {
        let events = self.events.read().await;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }

    async fn query(&self, query: EventQuery) -> Result<Vec<SagaEvent>> {
        let events = self.events.read().await;
        let matching = events.iter().filter(|e| query.matches(e)).cloned();
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventLogExt;
    use crate::{EventType, SagaId, TraceId};

    fn new_event(saga_id: SagaId, step: &str, event_type: EventType) -> NewSagaEvent {
        SagaEvent::builder()
            .saga_id(saga_id)
            .request_id("req-1")
            .trace_id(TraceId::new())
            .step(step)
            .event_type(event_type)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_log() {
        let log = InMemoryEventLog::new();
        assert_eq!(log.count().await.unwrap(), 0);
        assert_eq!(log.latest_offset().await.unwrap(), Offset::initial());
        assert!(log.replay_all().await.unwrap().is_empty());
        assert!(log.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn append_assigns_dense_one_based_offsets() {
        let log = InMemoryEventLog::new();
        let saga_id = SagaId::new();

        let first = log
            .append(new_event(saga_id, "ValidateRequestStep", EventType::StepCompleted))
            .await
            .unwrap();
        let second = log
            .append(new_event(saga_id, "RouteRegionStep", EventType::StepCompleted))
            .await
            .unwrap();

        assert_eq!(first, Offset::first());
        assert_eq!(second, Offset::new(2));
        assert_eq!(log.count().await.unwrap(), 2);
        assert_eq!(log.latest_offset().await.unwrap(), Offset::new(2));
    }

    #[tokio::test]
    async fn replay_all_is_ascending() {
        let log = InMemoryEventLog::new();
        let saga_id = SagaId::new();
        for step in ["A", "B", "C"] {
            log.append(new_event(saga_id, step, EventType::StepCompleted))
                .await
                .unwrap();
        }

        let events = log.replay_all().await.unwrap();
        let offsets: Vec<i64> = events.iter().map(|e| e.offset.as_i64()).collect();
        assert_eq!(offsets, vec![1, 2, 3]);
        let steps: Vec<&str> = events.iter().map(|e| e.step.as_str()).collect();
        assert_eq!(steps, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn list_recent_is_newest_first() {
        let log = InMemoryEventLog::new();
        let saga_id = SagaId::new();
        for step in ["A", "B", "C"] {
            log.append(new_event(saga_id, step, EventType::StepCompleted))
                .await
                .unwrap();
        }

        let recent = log.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].step, "C");
        assert_eq!(recent[1].step, "B");
    }

    #[tokio::test]
    async fn query_and_events_for_saga() {
        let log = InMemoryEventLog::new();
        let saga_a = SagaId::new();
        let saga_b = SagaId::new();

        log.append(new_event(saga_a, "A", EventType::StepCompleted))
            .await
            .unwrap();
        log.append(new_event(saga_b, "A", EventType::StepFailed))
            .await
            .unwrap();
        log.append(new_event(saga_a, "A", EventType::StepCompensated))
            .await
            .unwrap();

        let for_a = log.events_for_saga(saga_a).await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].offset, Offset::new(1));
        assert_eq!(for_a[1].offset, Offset::new(3));

        let failed = log
            .query(EventQuery::new().event_type(EventType::StepFailed))
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].saga_id, saga_b);

        let limited = log.query(EventQuery::new().limit(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].offset, Offset::first());
    }

    #[tokio::test]
    async fn stream_all_events() {
        use futures_util::StreamExt;

        let log = InMemoryEventLog::new();
        let saga_id = SagaId::new();
        log.append(new_event(saga_id, "A", EventType::StepCompleted))
            .await
            .unwrap();
        log.append(new_event(saga_id, "SagaLifecycle", EventType::SagaCompleted))
            .await
            .unwrap();

        let stream = log.stream_all().await.unwrap();
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_appends_never_reuse_offsets() {
        let log = InMemoryEventLog::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.append(new_event(SagaId::new(), "A", EventType::StepCompleted))
                    .await
                    .unwrap()
            }));
        }

        let mut offsets = Vec::new();
        for handle in handles {
            offsets.push(handle.await.unwrap().as_i64());
        }
        offsets.sort();
        assert_eq!(offsets, (1..=16).collect::<Vec<_>>());
    }
}
