//! Projection replay endpoints.

use axum::Json;
use axum::extract::State;
use orchestrator::Application;
use projections::ProjectionSnapshot;

use crate::error::ApiError;

/// POST /v2/replay: rebuilds the projection from the full event log.
#[tracing::instrument(skip(app))]
pub async fn replay(State(app): State<Application>) -> Result<Json<ProjectionSnapshot>, ApiError> {
    Ok(Json(app.replay().await?))
}

/// GET /v2/projection: returns the stored snapshot.
pub async fn get(State(app): State<Application>) -> Result<Json<ProjectionSnapshot>, ApiError> {
    Ok(Json(app.projection().await?))
}
