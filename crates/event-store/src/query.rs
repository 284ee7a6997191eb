use crate::{EventType, Offset, SagaId};

/// Builder for filtering the event log.
///
/// Results are always returned in ascending offset order.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Filter by saga execution.
    pub saga_id: Option<SagaId>,

    /// Filter by originating request.
    pub request_id: Option<String>,

    /// Filter by event types (any of these types).
    pub event_types: Option<Vec<EventType>>,

    /// Filter by minimum offset (inclusive).
    pub from_offset: Option<Offset>,

    /// Filter by maximum offset (inclusive).
    pub to_offset: Option<Offset>,

    /// Maximum number of events to return.
    pub limit: Option<usize>,
}

impl EventQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for all events of one saga execution.
    pub fn for_saga(saga_id: SagaId) -> Self {
        Self {
            saga_id: Some(saga_id),
            ..Default::default()
        }
    }

    /// Creates a query for all events produced on behalf of a request.
    pub fn for_request(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Default::default()
        }
    }

    pub fn saga_id(mut self, saga_id: SagaId) -> Self {
        self.saga_id = Some(saga_id);
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Filters by a single event type.
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_types = Some(vec![event_type]);
        self
    }

    /// Filters by multiple event types (any of these).
    pub fn event_types(mut self, event_types: Vec<EventType>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    pub fn from_offset(mut self, offset: Offset) -> Self {
        self.from_offset = Some(offset);
        self
    }

    pub fn to_offset(mut self, offset: Offset) -> Self {
        self.to_offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `event` passes every filter except `limit`.
    pub fn matches(&self, event: &crate::SagaEvent) -> bool {
        if let Some(saga_id) = self.saga_id
            && event.saga_id != saga_id
        {
            return false;
        }
        if let Some(ref request_id) = self.request_id
            && &event.request_id != request_id
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.contains(&event.event_type)
        {
            return false;
        }
        if let Some(from) = self.from_offset
            && event.offset < from
        {
            return false;
        }
        if let Some(to) = self.to_offset
            && event.offset > to
        {
            return false;
        }
        true
    }
}
