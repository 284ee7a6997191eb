use std::collections::BTreeMap;

use event_store::{EventType, SagaEvent};

use crate::projection::{Projection, ProjectionPosition};

/// Counts events per type under keys like `event_step_completed_total`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventHistogram {
    counters: BTreeMap<String, u64>,
    position: ProjectionPosition,
}

impl EventHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter key for an event type.
    pub fn counter_key(event_type: EventType) -> String {
        format!("event_{}_total", event_type.as_str().replace('.', "_"))
    }

    pub fn counters(&self) -> &BTreeMap<String, u64> {
        &self.counters
    }

    pub fn into_counters(self) -> BTreeMap<String, u64> {
        self.counters
    }
}

impl Projection for EventHistogram {
    fn name(&self) -> &'static str {
        "EventHistogram"
    }

    fn handle(&mut self, event: &SagaEvent) {
        *self
            .counters
            .entry(Self::counter_key(event.event_type))
            .or_insert(0) += 1;
        self.position = self.position.advance();
    }

    fn position(&self) -> ProjectionPosition {
        self.position
    }
}
