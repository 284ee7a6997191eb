//! Saga execution lookup.

use axum::Json;
use axum::extract::{Path, State};
use common::SagaId;
use orchestrator::Application;
use saga::SagaExecution;

use crate::error::ApiError;

/// GET /v2/sagas/{id}: rebuilds a saga's execution from its events.
#[tracing::instrument(skip(app))]
pub async fn get(
    State(app): State<Application>,
    Path(id): Path<String>,
) -> Result<Json<SagaExecution>, ApiError> {
    let saga_id = parse_saga_id(&id)?;

    app.saga_execution(saga_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Saga {id} not found")))
}

fn parse_saga_id(id: &str) -> Result<SagaId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid saga ID format: {e}")))?;
    Ok(SagaId::from_uuid(uuid))
}
