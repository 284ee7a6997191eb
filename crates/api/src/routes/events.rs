//! Event log inspection.

use axum::Json;
use axum::extract::{Query, State};
use event_store::SagaEvent;
use orchestrator::Application;
use serde::Deserialize;

use crate::error::ApiError;

const DEFAULT_EVENT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// GET /v2/events?limit=N: most recent events, newest first.
#[tracing::instrument(skip(app))]
pub async fn list(
    State(app): State<Application>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<SagaEvent>>, ApiError> {
    let limit = super::clamp_limit(query.limit, DEFAULT_EVENT_LIMIT);
    Ok(Json(app.recent_events(limit).await?))
}
