//! Top-level request execution: validate, fingerprint, deduplicate, run the
//! saga, cache the response.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{ErrorCode, TraceId};
use domain::{SagaRequest, ValidationIssue, ValidationRules};
use event_store::EventLog;
use idempotency::{IdempotencyError, IdempotencyStore, ReplayDecision, Reservation};
use projections::ProjectionReplayService;
use saga::{MetricsSink, SagaEngine, SagaRunContext, SagaRunResult};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::response::{
    DeliveryStatus, Durability, ErrorBody, ErrorResponse, OrchestratorResult, SUPPRESSED_TRACE_ID,
    SuccessResponse,
};

/// First and longest pause while another delivery holds the key.
const CLAIM_BACKOFF_START: Duration = Duration::from_millis(5);
const CLAIM_BACKOFF_MAX: Duration = Duration::from_millis(100);

/// Identity of one `execute` call.
struct StageContext {
    request_id: String,
    trace_id: TraceId,
    started: Instant,
}

impl StageContext {
    fn new(request_id: Option<String>) -> Self {
        Self {
            request_id: request_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            trace_id: TraceId::new(),
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    Denied,
    ValidationError,
}

impl Outcome {
    fn counter(&self) -> &'static str {
        match self {
            Outcome::Success => "outcome_success_total",
            Outcome::Denied => "outcome_denied_total",
            Outcome::ValidationError => "outcome_validation_error_total",
        }
    }
}

pub struct RequestOrchestrator {
    engine: SagaEngine,
    log: Arc<dyn EventLog>,
    idempotency: Arc<dyn IdempotencyStore>,
    projections: ProjectionReplayService,
    metrics: Arc<dyn MetricsSink>,
    rules: ValidationRules,
    enforce_deadline: bool,
    reservation_stale_after: Duration,
}

impl RequestOrchestrator {
    pub fn new(
        engine: SagaEngine,
        log: Arc<dyn EventLog>,
        idempotency: Arc<dyn IdempotencyStore>,
        projections: ProjectionReplayService,
        metrics: Arc<dyn MetricsSink>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            engine,
            log,
            idempotency,
            projections,
            metrics,
            rules: config.validation_rules(),
            enforce_deadline: config.enforce_deadline,
            reservation_stale_after: config.reservation_stale_after,
        }
    }

    /// Executes one raw request. Never fails: infrastructure errors come
    /// back as an `INTERNAL_ERROR` envelope.
    #[tracing::instrument(skip_all)]
    pub async fn execute(&self, raw: &Value) -> OrchestratorResult {
        let ctx = StageContext::new(requested_id(raw));
        tracing::info!(request_id = %ctx.request_id, trace_id = %ctx.trace_id, "Request received");
        self.metrics.increment("requests_total", 1);

        match self.try_execute(raw, &ctx).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(request_id = %ctx.request_id, error = %err, "Orchestration failed");
                fail(
                    &ctx,
                    ErrorCode::InternalError,
                    "Internal orchestration failure",
                    None,
                    DeliveryStatus::Processed,
                )
            }
        }
    }

    /// Executes a request given as raw bytes. A body that is not JSON is
    /// answered with a `VALIDATION_FAILED` envelope.
    pub async fn execute_body(&self, body: &[u8]) -> OrchestratorResult {
        let raw: Value = match serde_json::from_slice(body) {
            Ok(raw) => raw,
            Err(err) => {
                let ctx = StageContext::new(None);
                tracing::info!(request_id = %ctx.request_id, "Malformed request body");
                self.metrics.increment("requests_total", 1);
                self.record_outcome(Outcome::ValidationError, &ctx);
                let issues = vec![ValidationIssue::new("", format!("Malformed JSON: {err}"))];
                return self.reject(&ctx, issues);
            }
        };
        self.execute(&raw).await
    }

    async fn try_execute(&self, raw: &Value, ctx: &StageContext) -> Result<OrchestratorResult> {
        let request = match SagaRequest::parse(raw, &self.rules) {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(issues = err.issues.len(), "Request rejected by validation");
                self.record_outcome(Outcome::ValidationError, ctx);
                return Ok(self.reject(ctx, err.issues));
            }
        };

        let request_hash = request.fingerprint()?;
        let key = request.idempotency_key();
        if let Some(replayed) = self.claim(key, &request_hash, ctx).await? {
            return Ok(replayed);
        }

        let (response, cached) = match self.run_reserved(&request, ctx).await {
            Ok(produced) => produced,
            Err(err) => {
                if let Err(release_err) = self.idempotency.release(key).await {
                    tracing::error!(key, error = %release_err, "Failed to release reservation");
                }
                return Err(err);
            }
        };

        match self.idempotency.complete(key, &request_hash, cached).await {
            Ok(()) => {}
            Err(IdempotencyError::ReservationLost(_)) => {
                tracing::warn!(key, "Idempotency reservation lost before completion");
            }
            Err(err) => return Err(err.into()),
        }

        let outcome = if response.is_success() {
            Outcome::Success
        } else {
            Outcome::Denied
        };
        self.record_outcome(outcome, ctx);
        tracing::info!(request_id = %ctx.request_id, ?outcome, "Response generated");
        Ok(response)
    }

    /// Reserves `key` for this delivery. Returns `None` once the caller owns
    /// the key, or the response to answer with when another delivery does.
    /// While the holder's saga is still running the reservation is retried
    /// with backoff until its response lands or the holder gives the key up.
    async fn claim(
        &self,
        key: &str,
        request_hash: &str,
        ctx: &StageContext,
    ) -> Result<Option<OrchestratorResult>> {
        let mut backoff = CLAIM_BACKOFF_START;
        loop {
            let record = match self
                .idempotency
                .reserve(key, request_hash, self.reservation_stale_after)
                .await?
            {
                Reservation::Acquired => return Ok(None),
                Reservation::Existing(record) => record,
            };

            match record.decide(request_hash) {
                ReplayDecision::Deduplicate(cached) => {
                    return self.deduplicate(key, cached).map(Some);
                }
                ReplayDecision::Conflict => return Ok(Some(self.conflict(key, ctx))),
                ReplayDecision::Pending => {
                    tracing::debug!(key, ?backoff, "Waiting for in-flight delivery");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(CLAIM_BACKOFF_MAX);
                }
            }
        }
    }

    /// Runs the saga for a reserved key and returns the response together
    /// with the JSON to cache under the key.
    async fn run_reserved(
        &self,
        request: &SagaRequest,
        ctx: &StageContext,
    ) -> Result<(OrchestratorResult, Value)> {
        let run_ctx = SagaRunContext {
            request_id: ctx.request_id.clone(),
            trace_id: ctx.trace_id,
            timeout: self
                .enforce_deadline
                .then(|| Duration::from_millis(request.delivery.timeout_ms)),
        };
        let saga = self.engine.run(request, &run_ctx).await?;
        let response = self.build_response(ctx, request, saga).await?;
        let cached = serde_json::to_value(&response)?;
        Ok((response, cached))
    }

    fn reject(&self, ctx: &StageContext, issues: Vec<ValidationIssue>) -> OrchestratorResult {
        fail(
            ctx,
            ErrorCode::ValidationFailed,
            "Request payload failed schema validation",
            Some(json!({ "issues": issues })),
            DeliveryStatus::Processed,
        )
    }

    fn deduplicate(&self, key: &str, cached: Value) -> Result<OrchestratorResult> {
        self.metrics.increment("idempotency_deduplicated_total", 1);
        tracing::info!(key, "Serving deduplicated response");
        let cached: OrchestratorResult = serde_json::from_value(cached)?;
        Ok(cached.with_delivery_status(DeliveryStatus::Deduplicated))
    }

    fn conflict(&self, key: &str, ctx: &StageContext) -> OrchestratorResult {
        self.metrics.increment("idempotency_conflict_total", 1);
        tracing::warn!(key, "Idempotency key reused with a different payload");
        fail(
            ctx,
            ErrorCode::IdempotencyConflict,
            "Idempotency key reuse detected with mismatched payload",
            Some(json!({ "idempotencyKey": key })),
            DeliveryStatus::Deduplicated,
        )
    }

    async fn build_response(
        &self,
        ctx: &StageContext,
        request: &SagaRequest,
        saga: SagaRunResult,
    ) -> Result<OrchestratorResult> {
        let durability = Durability {
            event_log_offset: self.log.latest_offset().await?.as_i64(),
            projection_version: self.projections.snapshot().await?.projection_version,
            replayable: true,
        };

        let result = match saga {
            SagaRunResult::Success(saga) => {
                let saga = *saga;
                let mut policy = saga.policy;
                if !request.telemetry.include_policy_decisions {
                    policy.decisions.clear();
                }
                let trace_id = if request.telemetry.include_trace {
                    ctx.trace_id.to_string()
                } else {
                    SUPPRESSED_TRACE_ID.to_string()
                };

                OrchestratorResult::Success(Box::new(SuccessResponse {
                    request_id: ctx.request_id.clone(),
                    trace_id,
                    delivery_status: DeliveryStatus::Processed,
                    greeting: saga.greeting,
                    policy,
                    metrics: self.metrics.snapshot(),
                    saga_execution: saga.saga_execution,
                    routing_decision: saga.routing_decision,
                    chaos_report: saga.chaos_report,
                    durability,
                    runbook: saga.runbook,
                    enrichment: saga.enrichment,
                    incident: saga.incident,
                }))
            }
            SagaRunResult::Failure(saga) => {
                let saga = *saga;
                let mut details = match saga.details {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                details.insert("sagaExecution".into(), serde_json::to_value(&saga.saga_execution)?);
                details.insert(
                    "routingDecision".into(),
                    serde_json::to_value(&saga.routing_decision)?,
                );
                details.insert("chaosReport".into(), serde_json::to_value(&saga.chaos_report)?);
                details.insert("durability".into(), serde_json::to_value(&durability)?);
                details.insert("runbook".into(), serde_json::to_value(&saga.runbook)?);
                if let Value::Object(enrichment) = serde_json::to_value(&saga.enrichment)? {
                    details.extend(enrichment);
                }
                details.insert("incident".into(), serde_json::to_value(&saga.incident)?);

                fail(
                    ctx,
                    saga.code,
                    &saga.message,
                    Some(Value::Object(details)),
                    DeliveryStatus::Processed,
                )
            }
        };

        Ok(result)
    }

    fn record_outcome(&self, outcome: Outcome, ctx: &StageContext) {
        self.metrics.increment(outcome.counter(), 1);
        let elapsed_ms = u64::try_from(ctx.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.metrics.increment("latency_ms_total", elapsed_ms);
    }
}

/// A caller-supplied, non-empty `requestId`, read before validation.
fn requested_id(raw: &Value) -> Option<String> {
    raw.get("requestId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn fail(
    ctx: &StageContext,
    code: ErrorCode,
    message: &str,
    details: Option<Value>,
    delivery_status: DeliveryStatus,
) -> OrchestratorResult {
    tracing::debug!(request_id = %ctx.request_id, %code, "Response failed");
    OrchestratorResult::Error(ErrorResponse {
        request_id: ctx.request_id.clone(),
        trace_id: ctx.trace_id.to_string(),
        delivery_status,
        error: ErrorBody {
            code,
            message: message.to_string(),
            details,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ErrorResponse;
    use event_store::{EventLogExt, InMemoryEventLog};
    use idempotency::InMemoryIdempotencyStore;
    use projections::InMemoryProjectionStore;
    use saga::{DeterministicEnrichmentPipeline, InMemoryMetrics, OperationsService};

    struct Fixture {
        orchestrator: RequestOrchestrator,
        log: Arc<InMemoryEventLog>,
        store: Arc<InMemoryIdempotencyStore>,
        config: OrchestratorConfig,
    }

    impl Fixture {
        fn new(config: OrchestratorConfig) -> Self {
            let log = Arc::new(InMemoryEventLog::new());
            let store = Arc::new(InMemoryIdempotencyStore::new());
            let metrics = Arc::new(InMemoryMetrics::new());
            let engine = SagaEngine::new(
                log.clone(),
                config.policy(),
                Arc::new(DeterministicEnrichmentPipeline::new(metrics.clone())),
                Arc::new(OperationsService::new()),
                metrics.clone(),
            );
            let projections =
                ProjectionReplayService::new(log.clone(), Arc::new(InMemoryProjectionStore::new()));
            let orchestrator = RequestOrchestrator::new(
                engine,
                log.clone(),
                store.clone(),
                projections,
                metrics,
                &config,
            );
            Self {
                orchestrator,
                log,
                store,
                config,
            }
        }

        fn fingerprint(&self, raw: &Value) -> String {
            SagaRequest::parse(raw, &self.config.validation_rules())
                .unwrap()
                .fingerprint()
                .unwrap()
        }
    }

    fn raw_request(key: &str) -> Value {
        json!({
            "recipient": "World",
            "formality": "casual",
            "locale": "en-US",
            "policies": {"complianceProfile": "strict-default", "enforceMetadataRules": true},
            "telemetry": {"includeTrace": true, "includePolicyDecisions": true},
            "delivery": {"idempotencyKey": key, "timeoutMs": 5000, "retryBudget": 0},
            "routing": {"preferredRegion": "us-east-1"},
            "governance": {"changeTicket": "CHG-11", "riskClass": "low"}
        })
    }

    fn stored_response() -> OrchestratorResult {
        OrchestratorResult::Error(ErrorResponse {
            request_id: "req-holder".to_string(),
            trace_id: "trace-holder".to_string(),
            delivery_status: DeliveryStatus::Processed,
            error: ErrorBody {
                code: ErrorCode::PolicyDenied,
                message: "denied".to_string(),
                details: None,
            },
        })
    }

    #[test]
    fn requested_id_requires_non_empty_string() {
        assert_eq!(requested_id(&json!({"requestId": "abc"})), Some("abc".to_string()));
        assert_eq!(requested_id(&json!({"requestId": ""})), None);
        assert_eq!(requested_id(&json!({"requestId": 7})), None);
        assert_eq!(requested_id(&json!("not an object")), None);
    }

    #[tokio::test]
    async fn waits_for_in_flight_delivery_and_replays_its_response() {
        let f = Fixture::new(OrchestratorConfig::default());
        let raw = raw_request("held-key");
        let hash = f.fingerprint(&raw);
        let stale_after = f.config.reservation_stale_after;
        f.store.reserve("held-key", &hash, stale_after).await.unwrap();

        let holder = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let response = serde_json::to_value(stored_response()).unwrap();
            f.store.complete("held-key", &hash, response).await.unwrap();
        };
        let (result, ()) = tokio::join!(f.orchestrator.execute(&raw), holder);

        assert_eq!(result.delivery_status(), DeliveryStatus::Deduplicated);
        assert_eq!(result.request_id(), "req-holder");
        assert_eq!(result.error_code(), Some(ErrorCode::PolicyDenied));
        assert!(f.log.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn waiting_delivery_runs_saga_after_holder_releases() {
        let f = Fixture::new(OrchestratorConfig::default());
        let raw = raw_request("released-key");
        let hash = f.fingerprint(&raw);
        let stale_after = f.config.reservation_stale_after;
        f.store.reserve("released-key", &hash, stale_after).await.unwrap();

        let holder = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            f.store.release("released-key").await.unwrap();
        };
        let (result, ()) = tokio::join!(f.orchestrator.execute(&raw), holder);

        assert_eq!(result.delivery_status(), DeliveryStatus::Processed);
        assert!(!f.log.is_empty().await.unwrap());
        let record = f.store.find("released-key").await.unwrap().unwrap();
        assert!(!record.is_pending());
    }

    #[tokio::test]
    async fn pending_reservation_with_other_payload_conflicts_immediately() {
        let f = Fixture::new(OrchestratorConfig::default());
        let stale_after = f.config.reservation_stale_after;
        f.store
            .reserve("busy-key", "other-hash", stale_after)
            .await
            .unwrap();

        let result = f.orchestrator.execute(&raw_request("busy-key")).await;
        assert_eq!(result.error_code(), Some(ErrorCode::IdempotencyConflict));
        assert_eq!(result.delivery_status(), DeliveryStatus::Deduplicated);
        assert!(f.log.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn abandoned_reservation_is_taken_over() {
        let config = OrchestratorConfig {
            reservation_stale_after: Duration::ZERO,
            ..OrchestratorConfig::default()
        };
        let f = Fixture::new(config);
        let raw = raw_request("abandoned-key");
        let hash = f.fingerprint(&raw);
        f.store
            .reserve("abandoned-key", &hash, Duration::from_secs(120))
            .await
            .unwrap();

        let result = f.orchestrator.execute(&raw).await;
        assert_eq!(result.delivery_status(), DeliveryStatus::Processed);
        assert!(!f.log.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_failure() {
        let f = Fixture::new(OrchestratorConfig::default());

        let result = f.orchestrator.execute_body(b"{not json").await;
        assert_eq!(result.error_code(), Some(ErrorCode::ValidationFailed));
        let json = serde_json::to_value(&result).unwrap();
        let message = json["error"]["details"]["issues"][0]["message"]
            .as_str()
            .unwrap();
        assert!(message.starts_with("Malformed JSON"));
        assert!(f.store.is_empty().await);
    }
}
