//! Incident intake and runbook generation.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SagaId;
use domain::{RunbookGenerationEngine, Severity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{read, write};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub severity: Severity,
    pub title: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunbookRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub incident_id: Uuid,
    pub title: String,
    pub actions: Vec<String>,
}

/// Provenance of a generated runbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunbookGenerationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saga_id: Option<SagaId>,
    pub runbook_id: Uuid,
    pub incident_id: Uuid,
    pub code: String,
    pub fingerprint: String,
    pub generator_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRequest {
    pub severity: Severity,
    pub title: String,
    pub details: String,
    pub code: String,
    pub request_id: Option<String>,
    pub saga_id: Option<SagaId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaisedIncident {
    pub incident: IncidentRecord,
    pub runbook: RunbookRecord,
}

#[async_trait]
pub trait IncidentSink: Send + Sync {
    /// Records an incident and the runbook generated for it.
    async fn raise_incident(&self, request: IncidentRequest) -> Result<RaisedIncident>;
}

#[derive(Debug, Default)]
struct OperationsState {
    incidents: Vec<IncidentRecord>,
    runbooks: Vec<RunbookRecord>,
    generations: Vec<RunbookGenerationRecord>,
}

/// In-memory incident desk.
#[derive(Debug, Default)]
pub struct OperationsService {
    engine: RunbookGenerationEngine,
    state: RwLock<OperationsState>,
}

impl OperationsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns up to `limit` incidents, newest first.
    pub fn list_incidents(&self, limit: usize) -> Vec<IncidentRecord> {
        read(&self.state)
            .incidents
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn incident_count(&self) -> usize {
        read(&self.state).incidents.len()
    }

    pub fn runbook_for_incident(&self, incident_id: Uuid) -> Option<RunbookRecord> {
        read(&self.state)
            .runbooks
            .iter()
            .find(|r| r.incident_id == incident_id)
            .cloned()
    }

    pub fn generation_records(&self) -> Vec<RunbookGenerationRecord> {
        read(&self.state).generations.clone()
    }
}

#[async_trait]
impl IncidentSink for OperationsService {
    #[tracing::instrument(skip(self, request), fields(code = %request.code, severity = %request.severity))]
    async fn raise_incident(&self, request: IncidentRequest) -> Result<RaisedIncident> {
        let incident = IncidentRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            severity: request.severity,
            title: request.title,
            details: request.details,
        };

        let plan = self.engine.generate(
            &incident.id.to_string(),
            incident.severity,
            &incident.title,
            &incident.details,
            &request.code,
        );
        let runbook = RunbookRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            incident_id: incident.id,
            title: plan.title,
            actions: plan.actions,
        };
        let generation = RunbookGenerationRecord {
            request_id: request.request_id,
            saga_id: request.saga_id,
            runbook_id: runbook.id,
            incident_id: incident.id,
            code: request.code,
            fingerprint: plan.fingerprint,
            generator_id: plan.generator_id,
            created_at: runbook.created_at,
        };

        {
            let mut state = write(&self.state);
            state.incidents.push(incident.clone());
            state.runbooks.push(runbook.clone());
            state.generations.push(generation);
        }

        metrics::counter!("incidents_raised_total").increment(1);
        tracing::warn!(incident_id = %incident.id, "Incident raised");

        Ok(RaisedIncident { incident, runbook })
    }
}
