//! HTTP route handlers.

pub mod events;
pub mod health;
pub mod incidents;
pub mod metrics;
pub mod orchestrate;
pub mod projection;
pub mod sagas;

/// Upper bound on list endpoints.
pub const MAX_LIST_LIMIT: usize = 500;

/// Clamps a caller-supplied list limit into `1..=MAX_LIST_LIMIT`.
pub(crate) fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
}
