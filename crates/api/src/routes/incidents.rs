//! Incident listing and synthetic incident intake.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use domain::Severity;
use orchestrator::{Application, IncidentView};
use saga::{IncidentRequest, RaisedIncident};
use serde::Deserialize;

use crate::error::ApiError;

const DEFAULT_INCIDENT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct IncidentsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SimulateIncidentRequest {
    pub severity: Severity,
    pub code: String,
    pub title: Option<String>,
    pub details: Option<String>,
}

/// GET /v2/incidents: newest incidents with their runbooks.
pub async fn list(
    State(app): State<Application>,
    Query(query): Query<IncidentsQuery>,
) -> Json<Vec<IncidentView>> {
    let limit = super::clamp_limit(query.limit, DEFAULT_INCIDENT_LIMIT);
    Json(app.incidents(limit))
}

/// POST /v2/incidents/simulate: raises a synthetic incident.
#[tracing::instrument(skip(app, req))]
pub async fn simulate(
    State(app): State<Application>,
    Json(req): Json<SimulateIncidentRequest>,
) -> Result<(StatusCode, Json<RaisedIncident>), ApiError> {
    let code = req.code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("Incident code must not be empty".to_string()));
    }

    let request = IncidentRequest {
        severity: req.severity,
        title: req
            .title
            .unwrap_or_else(|| format!("Simulated {code} incident")),
        details: req
            .details
            .unwrap_or_else(|| "Synthetic incident raised through the operations API".to_string()),
        code: code.to_string(),
        request_id: None,
        saga_id: None,
    };

    let raised = app.simulate_incident(request).await?;
    tracing::info!(
        incident_id = %raised.incident.id,
        severity = %raised.incident.severity,
        "Simulated incident raised"
    );
    Ok((StatusCode::CREATED, Json(raised)))
}
