//! Core projection trait and position tracking.

use event_store::SagaEvent;

/// Tracks how many events a projection has folded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Number of events processed by this projection.
    pub events_processed: u64,
}

impl ProjectionPosition {
    /// Creates a new position at zero.
    pub fn zero() -> Self {
        Self {
            events_processed: 0,
        }
    }

    /// Advances the position by one event.
    pub fn advance(&self) -> Self {
        Self {
            events_processed: self.events_processed + 1,
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.events_processed)
    }
}

/// A projection folds log events, in offset order, into derived state.
pub trait Projection: Send {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Folds a single event.
    fn handle(&mut self, event: &SagaEvent);

    /// Returns how many events have been folded.
    fn position(&self) -> ProjectionPosition;
}
