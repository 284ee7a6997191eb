//! Wiring of stores, collaborators and the orchestrator into one
//! application handle.

use std::sync::Arc;

use common::SagaId;
use event_store::{EventLog, EventLogExt, InMemoryEventLog, PostgresEventLog, SagaEvent};
use idempotency::{IdempotencyStore, InMemoryIdempotencyStore, PostgresIdempotencyStore};
use projections::{
    InMemoryProjectionStore, PostgresProjectionStore, ProjectionReplayService, ProjectionSnapshot,
    ProjectionStore,
};
use saga::{
    DeterministicEnrichmentPipeline, IncidentRecord, IncidentRequest, IncidentSink,
    InMemoryMetrics, MetricsSink, MetricsSnapshot, OperationsService, RaisedIncident,
    RunbookRecord, SagaEngine, SagaExecution,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::orchestrator::RequestOrchestrator;
use crate::response::OrchestratorResult;

/// An incident together with the runbook generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentView {
    pub incident: IncidentRecord,
    pub runbook: Option<RunbookRecord>,
}

/// Everything a transport needs to serve requests.
#[derive(Clone)]
pub struct Application {
    orchestrator: Arc<RequestOrchestrator>,
    log: Arc<dyn EventLog>,
    projections: ProjectionReplayService,
    operations: Arc<OperationsService>,
    enrichment: Arc<DeterministicEnrichmentPipeline>,
    metrics: Arc<InMemoryMetrics>,
}

impl Application {
    /// Builds an application over in-memory stores.
    pub fn in_memory(config: &OrchestratorConfig) -> Self {
        Self::assemble(
            config,
            Arc::new(InMemoryEventLog::new()),
            Arc::new(InMemoryIdempotencyStore::new()),
            Arc::new(InMemoryProjectionStore::new()),
        )
    }

    /// Builds an application whose event log, idempotency ledger and
    /// projection live in PostgreSQL. Runs pending migrations first.
    pub async fn with_postgres(pool: PgPool, config: &OrchestratorConfig) -> Result<Self> {
        let log = PostgresEventLog::new(pool.clone());
        log.run_migrations().await?;

        Ok(Self::assemble(
            config,
            Arc::new(log),
            Arc::new(PostgresIdempotencyStore::new(pool.clone())),
            Arc::new(PostgresProjectionStore::new(pool)),
        ))
    }

    fn assemble(
        config: &OrchestratorConfig,
        log: Arc<dyn EventLog>,
        idempotency: Arc<dyn IdempotencyStore>,
        projection_store: Arc<dyn ProjectionStore>,
    ) -> Self {
        let metrics = Arc::new(InMemoryMetrics::new());
        let enrichment = Arc::new(DeterministicEnrichmentPipeline::new(metrics.clone()));
        let operations = Arc::new(OperationsService::new());
        let projections = ProjectionReplayService::new(log.clone(), projection_store);

        let engine = SagaEngine::new(
            log.clone(),
            config.policy(),
            enrichment.clone(),
            operations.clone(),
            metrics.clone(),
        );
        let orchestrator = RequestOrchestrator::new(
            engine,
            log.clone(),
            idempotency,
            projections.clone(),
            metrics.clone(),
            config,
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            log,
            projections,
            operations,
            enrichment,
            metrics,
        }
    }

    pub async fn execute(&self, raw: &Value) -> OrchestratorResult {
        self.orchestrator.execute(raw).await
    }

    /// Executes a request body that has not been parsed yet.
    pub async fn execute_body(&self, body: &[u8]) -> OrchestratorResult {
        self.orchestrator.execute_body(body).await
    }

    /// Rebuilds the projection from the full event log.
    pub async fn replay(&self) -> Result<ProjectionSnapshot> {
        Ok(self.projections.replay().await?)
    }

    pub async fn projection(&self) -> Result<ProjectionSnapshot> {
        Ok(self.projections.snapshot().await?)
    }

    /// Returns up to `limit` events, newest first.
    pub async fn recent_events(&self, limit: usize) -> Result<Vec<SagaEvent>> {
        Ok(self.log.list_recent(limit).await?)
    }

    /// Rebuilds a saga's execution from its events.
    pub async fn saga_execution(&self, saga_id: SagaId) -> Result<Option<SagaExecution>> {
        let events = self.log.events_for_saga(saga_id).await?;
        Ok(SagaExecution::from_events(saga_id, &events))
    }

    /// Returns up to `limit` incidents, newest first, with their runbooks.
    pub fn incidents(&self, limit: usize) -> Vec<IncidentView> {
        self.operations
            .list_incidents(limit)
            .into_iter()
            .map(|incident| IncidentView {
                runbook: self.operations.runbook_for_incident(incident.id),
                incident,
            })
            .collect()
    }

    /// Raises an incident outside of any saga.
    pub async fn simulate_incident(&self, request: IncidentRequest) -> Result<RaisedIncident> {
        Ok(self.operations.raise_incident(request).await?)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn enrichment(&self) -> &DeterministicEnrichmentPipeline {
        &self.enrichment
    }
}
