//! Saga orchestration endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use common::ErrorCode;
use orchestrator::{Application, OrchestratorResult};

/// POST /v2/orchestrate: runs (or replays) one orchestration request.
///
/// The body is taken as raw bytes regardless of content type, so malformed
/// JSON and schema problems both surface as `VALIDATION_FAILED` envelopes.
#[tracing::instrument(skip(app, body))]
pub async fn execute(
    State(app): State<Application>,
    body: Bytes,
) -> (StatusCode, Json<OrchestratorResult>) {
    let result = app.execute_body(&body).await;
    let status = status_for(&result);
    metrics::counter!("http_orchestrate_responses_total", "status" => status.as_u16().to_string())
        .increment(1);

    tracing::info!(
        request_id = %result.request_id(),
        status = status.as_u16(),
        "Orchestration request served"
    );
    (status, Json(result))
}

/// Maps an orchestration outcome to its HTTP status.
pub fn status_for(result: &OrchestratorResult) -> StatusCode {
    match result.error_code() {
        None => StatusCode::OK,
        Some(ErrorCode::ValidationFailed) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorCode::IdempotencyConflict) => StatusCode::CONFLICT,
        Some(ErrorCode::InternalError) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(
            ErrorCode::PolicyDenied
            | ErrorCode::ChaosTimeout
            | ErrorCode::EnrichmentPipelineFailed
            | ErrorCode::EnrichmentPersistFailed,
        ) => StatusCode::FAILED_DEPENDENCY,
    }
}
