use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventStoreError, SagaId, TraceId};

/// Position of an event in the log.
///
/// Offsets start at 1 for the first appended event and are never reused.
/// An empty log reports [`Offset::initial`] (0) as its latest offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Offset(i64);

impl Offset {
    /// Creates an offset from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The offset of an empty log.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The offset assigned to the first appended event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next offset.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw offset value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Offset {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Offset> for i64 {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}

/// Kind of transition recorded by a saga event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "step.completed")]
    StepCompleted,
    #[serde(rename = "step.failed")]
    StepFailed,
    #[serde(rename = "step.compensated")]
    StepCompensated,
    #[serde(rename = "saga.completed")]
    SagaCompleted,
    #[serde(rename = "saga.compensated")]
    SagaCompensated,
    #[serde(rename = "saga.failed")]
    SagaFailed,
}

impl EventType {
    /// All event types, in declaration order.
    pub const ALL: [EventType; 6] = [
        EventType::StepCompleted,
        EventType::StepFailed,
        EventType::StepCompensated,
        EventType::SagaCompleted,
        EventType::SagaCompensated,
        EventType::SagaFailed,
    ];

    /// Returns the dotted wire name, e.g. `step.completed`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::StepCompleted => "step.completed",
            EventType::StepFailed => "step.failed",
            EventType::StepCompensated => "step.compensated",
            EventType::SagaCompleted => "saga.completed",
            EventType::SagaCompensated => "saga.compensated",
            EventType::SagaFailed => "saga.failed",
        }
    }

    /// Returns true for saga-level lifecycle events.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            EventType::SagaCompleted | EventType::SagaCompensated | EventType::SagaFailed
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EventStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EventStoreError::UnknownEventType(s.to_string()))
    }
}

/// An immutable event stored in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaEvent {
    /// Position assigned by the log on append.
    pub offset: Offset,

    /// When the event was created.
    pub timestamp: DateTime<Utc>,

    /// The saga execution this event belongs to.
    pub saga_id: SagaId,

    /// The request that started the saga.
    pub request_id: String,

    /// Trace correlating all events of one request.
    pub trace_id: TraceId,

    /// Step name, or `SagaLifecycle` for lifecycle events.
    pub step: String,

    /// The recorded transition.
    pub event_type: EventType,

    /// Optional step-specific JSON payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl SagaEvent {
    /// Creates a new event builder.
    pub fn builder() -> SagaEventBuilder {
        SagaEventBuilder::default()
    }
}

/// An event that has not been appended yet and therefore has no offset.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSagaEvent {
    pub timestamp: DateTime<Utc>,
    pub saga_id: SagaId,
    pub request_id: String,
    pub trace_id: TraceId,
    pub step: String,
    pub event_type: EventType,
    pub payload: Option<serde_json::Value>,
}

impl NewSagaEvent {
    /// Stamps the event with the offset assigned by the log.
    pub fn into_event(self, offset: Offset) -> SagaEvent {
        SagaEvent {
            offset,
            timestamp: self.timestamp,
            saga_id: self.saga_id,
            request_id: self.request_id,
            trace_id: self.trace_id,
            step: self.step,
            event_type: self.event_type,
            payload: self.payload,
        }
    }
}

/// Builder for events about to be appended.
#[derive(Debug, Default)]
pub struct SagaEventBuilder {
    timestamp: Option<DateTime<Utc>>,
    saga_id: Option<SagaId>,
    request_id: Option<String>,
    trace_id: Option<TraceId>,
    step: Option<String>,
    event_type: Option<EventType>,
    payload: Option<serde_json::Value>,
}

impl SagaEventBuilder {
    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn saga_id(mut self, saga_id: SagaId) -> Self {
        self.saga_id = Some(saga_id);
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the event, failing if a required field is missing.
    ///
    /// The payload is optional.
    pub fn build(self) -> crate::Result<NewSagaEvent> {
        Ok(NewSagaEvent {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            saga_id: self.saga_id.ok_or(EventStoreError::MissingField("saga_id"))?,
            request_id: self
                .request_id
                .ok_or(EventStoreError::MissingField("request_id"))?,
            trace_id: self
                .trace_id
                .ok_or(EventStoreError::MissingField("trace_id"))?,
            step: self.step.ok_or(EventStoreError::MissingField("step"))?,
            event_type: self
                .event_type
                .ok_or(EventStoreError::MissingField("event_type"))?,
            payload: self.payload,
        })
    }
}
