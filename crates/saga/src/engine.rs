//! The saga engine: runs the step sequence for one request, appending an
//! event per transition and compensating on any in-saga failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use common::{ErrorCode, SagaId, TraceId};
use domain::{
    ENTERPRISE_EDITION, EnrichmentBundle, PolicyGate, SagaRequest, Severity, strategy_for,
};
use event_store::{EventLog, EventStoreError, EventType, Offset, SagaEvent};
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::chaos::{ChaosDecision, ChaosInput, DeterministicFaultInjector};
use crate::compensation::CompensationPlanner;
use crate::error::{Result, SagaError};
use crate::execution::{SagaExecution, StepResult};
use crate::outcome::{
    ChaosReport, GreetingOutput, IncidentSummary, RoutingDecision, RunbookSummary,
    SagaRunFailure, SagaRunResult, SagaRunSuccess,
};
use crate::services::{
    EnrichmentContext, EnrichmentPipeline, IncidentRequest, IncidentSink, MetricsSink,
};
use crate::state::SagaStatus;
use crate::steps::{LIFECYCLE_STEP, SagaStep, deadline_message};

const INCIDENT_SEVERITY: Severity = Severity::Sev2;

/// Identity and deadline of one run.
#[derive(Debug, Clone)]
pub struct SagaRunContext {
    pub request_id: String,
    pub trace_id: TraceId,
    /// Overall budget for the run; `None` disables deadline checks.
    pub timeout: Option<Duration>,
}

/// Why a run stopped before completing.
struct Abort {
    code: ErrorCode,
    message: String,
    details: Value,
    bundle: Option<EnrichmentBundle>,
}

enum Halt {
    Abort(Abort),
    Infra(SagaError),
}

impl From<SagaError> for Halt {
    fn from(err: SagaError) -> Self {
        Halt::Infra(err)
    }
}

impl From<EventStoreError> for Halt {
    fn from(err: EventStoreError) -> Self {
        Halt::Infra(err.into())
    }
}

type StepFlow<T> = std::result::Result<T, Halt>;

/// Mutable state of a run in progress.
struct Run<'a> {
    ctx: &'a SagaRunContext,
    execution: SagaExecution,
    routing: RoutingDecision,
    chaos: ChaosReport,
    seed_base: String,
    deadline: Option<Instant>,
}

impl Run<'_> {
    fn saga_id(&self) -> SagaId {
        self.execution.saga_id
    }

    fn absorb(&mut self, decision: &ChaosDecision) {
        self.chaos.simulated_latency_ms += decision.simulated_latency_ms;
        self.chaos
            .injected_faults
            .extend(decision.injected_faults.iter().cloned());
        self.chaos.deterministic_key = decision.deterministic_key.clone();
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    fn timeout_ms(&self) -> u64 {
        self.ctx
            .timeout
            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

/// Drives saga runs over the event log and the injected collaborators.
pub struct SagaEngine {
    log: Arc<dyn EventLog>,
    policy: Arc<dyn PolicyGate>,
    enrichment: Arc<dyn EnrichmentPipeline>,
    incidents: Arc<dyn IncidentSink>,
    metrics: Arc<dyn MetricsSink>,
    injector: DeterministicFaultInjector,
    planner: CompensationPlanner,
}

impl SagaEngine {
    pub fn new(
        log: Arc<dyn EventLog>,
        policy: Arc<dyn PolicyGate>,
        enrichment: Arc<dyn EnrichmentPipeline>,
        incidents: Arc<dyn IncidentSink>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            log,
            policy,
            enrichment,
            incidents,
            metrics,
            injector: DeterministicFaultInjector::new(),
            planner: CompensationPlanner::new(),
        }
    }

    /// Executes one saga for a validated request.
    ///
    /// Business failures come back as [`SagaRunResult::Failure`] after
    /// compensation; `Err` means the event log or incident sink failed.
    #[tracing::instrument(
        skip(self, request, ctx),
        fields(request_id = %ctx.request_id, trace_id = %ctx.trace_id)
    )]
    pub async fn run(
        &self,
        request: &SagaRequest,
        ctx: &SagaRunContext,
    ) -> Result<SagaRunResult> {
        let started = std::time::Instant::now();
        let mut run = Run {
            ctx,
            execution: SagaExecution::start(SagaId::new()),
            routing: RoutingDecision {
                selected_region: request.routing.preferred_region.clone(),
                attempts: 1,
                fallback_used: false,
            },
            chaos: ChaosReport::default(),
            seed_base: request
                .chaos
                .seed
                .clone()
                .unwrap_or_else(|| ctx.request_id.clone()),
            deadline: ctx.timeout.map(|t| Instant::now() + t),
        };
        tracing::info!(saga_id = %run.saga_id(), "Saga started");

        let result = match self.execute_steps(request, &mut run).await {
            Ok(success) => Ok(SagaRunResult::Success(Box::new(success))),
            Err(Halt::Abort(abort)) => self
                .compensate_and_fail(&mut run, abort)
                .await
                .map(|failure| SagaRunResult::Failure(Box::new(failure))),
            Err(Halt::Infra(err)) => {
                tracing::error!(
                    saga_id = %run.saga_id(),
                    error = %err,
                    "Saga aborted by infrastructure error"
                );
                Err(err)
            }
        };

        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_steps(
        &self,
        request: &SagaRequest,
        run: &mut Run<'_>,
    ) -> StepFlow<SagaRunSuccess> {
        // Validate
        self.checkpoint(run, SagaStep::ValidateRequest).await?;
        self.complete(
            run,
            SagaStep::ValidateRequest,
            Some(json!({
                "changeTicket": request.governance.change_ticket,
                "riskClass": request.governance.risk_class,
            })),
        )
        .await?;

        // Route
        self.checkpoint(run, SagaStep::RouteRegion).await?;
        let route_chaos = self.injector.decide(&ChaosInput {
            seed_base: run.seed_base.clone(),
            step: SagaStep::RouteRegion.as_str().to_string(),
            attempt: 1,
            partition_simulation: request.chaos.partition_simulation,
            latency_jitter_ms: request.chaos.latency_jitter_ms,
        });
        run.absorb(&route_chaos);
        if route_chaos.partition_triggered
            && let Some(fallback) = request.routing.fallback_regions.first()
        {
            tracing::warn!(
                preferred = %request.routing.preferred_region,
                fallback = %fallback,
                "Partition injected, routing to fallback region"
            );
            run.routing = RoutingDecision {
                selected_region: fallback.clone(),
                attempts: 2,
                fallback_used: true,
            };
        }
        self.metrics.increment(
            &format!("region_{}_selected_total", run.routing.selected_region),
            1,
        );
        self.complete(
            run,
            SagaStep::RouteRegion,
            Some(json!({
                "selectedRegion": run.routing.selected_region,
                "fallbackUsed": run.routing.fallback_used,
                "attempts": run.routing.attempts,
            })),
        )
        .await?;

        // Policy
        self.checkpoint(run, SagaStep::PolicyGate).await?;
        let policy = self.policy.evaluate(request);
        let decisions = json!({ "decisions": policy.decisions });
        if !policy.is_allowed() {
            self.fail(run, SagaStep::PolicyGate, Some(decisions.clone()))
                .await?;
            return Err(abort(
                ErrorCode::PolicyDenied,
                "Request rejected by strict-default policy",
                decisions,
            ));
        }
        self.complete(run, SagaStep::PolicyGate, Some(decisions))
            .await?;

        // Generate
        self.checkpoint(run, SagaStep::GenerateGreeting).await?;
        let generation_chaos = self.injector.decide(&ChaosInput {
            seed_base: run.seed_base.clone(),
            step: SagaStep::GenerateGreeting.as_str().to_string(),
            attempt: 1,
            partition_simulation: false,
            latency_jitter_ms: request.chaos.latency_jitter_ms,
        });
        run.absorb(&generation_chaos);
        if generation_chaos.timeout_triggered {
            let details = json!({ "deterministicKey": generation_chaos.deterministic_key });
            self.fail(run, SagaStep::GenerateGreeting, Some(details.clone()))
                .await?;
            return Err(abort(
                ErrorCode::ChaosTimeout,
                "Deterministic chaos timeout in greeting generation",
                details,
            ));
        }
        let base_greeting = strategy_for(request.formality).render(&request.recipient);
        self.complete(
            run,
            SagaStep::GenerateGreeting,
            Some(json!({
                "formality": request.formality,
                "recipient": request.recipient,
            })),
        )
        .await?;

        // Enrich
        self.checkpoint(run, SagaStep::EnhanceGreeting).await?;
        let enrichment_ctx = EnrichmentContext {
            request_id: run.ctx.request_id.clone(),
            trace_id: run.ctx.trace_id.to_string(),
            saga_id: run.saga_id(),
            selected_region: run.routing.selected_region.clone(),
            base_greeting,
            event_volume: self.log.count().await?,
        };
        let bundle = match self
            .bounded(run, SagaStep::EnhanceGreeting, None, || {
                self.enrichment.run(request, &enrichment_ctx)
            })
            .await?
        {
            Ok(bundle) => bundle,
            Err(err) => {
                let error = err.to_string();
                self.fail(
                    run,
                    SagaStep::EnhanceGreeting,
                    Some(json!({ "error": error })),
                )
                .await?;
                return Err(abort(
                    ErrorCode::EnrichmentPipelineFailed,
                    "Enrichment pipeline execution failed",
                    json!({ "stage": "run", "error": error }),
                ));
            }
        };

        let ai = &bundle.ai_enhancement_report;
        self.complete(
            run,
            SagaStep::EnhanceGreeting,
            Some(json!({
                "promptFingerprint": ai.prompt_fingerprint,
                "profile": ai.profile,
            })),
        )
        .await?;
        self.checkpoint_with(run, SagaStep::ComputeSentiment, Some(&bundle))
            .await?;
        self.complete(
            run,
            SagaStep::ComputeSentiment,
            Some(json!({
                "genAiSentimentScore": bundle.enterprise_metadata.gen_ai_sentiment_score,
            })),
        )
        .await?;
        self.checkpoint_with(run, SagaStep::CalculateEsgOffset, Some(&bundle))
            .await?;
        self.complete(
            run,
            SagaStep::CalculateEsgOffset,
            Some(json!({
                "certificateId": bundle.esg_offset_report.certificate_id,
                "offsetPurchasedGrams": bundle.esg_offset_report.offset_purchased_grams,
            })),
        )
        .await?;
        self.checkpoint_with(run, SagaStep::AssessMoat, Some(&bundle))
            .await?;
        self.complete(
            run,
            SagaStep::AssessMoat,
            Some(json!({
                "score": bundle.moat_assessment.score,
                "quartile": bundle.moat_assessment.quartile,
            })),
        )
        .await?;

        // Persist enrichment
        self.checkpoint_with(run, SagaStep::PersistEnrichmentArtifacts, Some(&bundle))
            .await?;
        let persist_ctx = EnrichmentContext {
            event_volume: self.log.count().await?,
            ..enrichment_ctx
        };
        let persisted = self
            .bounded(run, SagaStep::PersistEnrichmentArtifacts, Some(&bundle), || {
                self.enrichment.persist(request, &persist_ctx, &bundle)
            })
            .await?;
        if let Err(err) = persisted {
            let error = err.to_string();
            self.fail(
                run,
                SagaStep::PersistEnrichmentArtifacts,
                Some(json!({ "error": error })),
            )
            .await?;
            return Err(Halt::Abort(Abort {
                code: ErrorCode::EnrichmentPersistFailed,
                message: "Failed to persist enrichment artifacts".to_string(),
                details: json!({
                    "stage": "persist",
                    "error": error,
                    "aiPromptFingerprint": bundle.ai_enhancement_report.prompt_fingerprint,
                }),
                bundle: Some(bundle),
            }));
        }
        self.complete(
            run,
            SagaStep::PersistEnrichmentArtifacts,
            Some(json!({
                "aiFingerprint": bundle.ai_enhancement_report.prompt_fingerprint,
                "esgCertificateId": bundle.esg_offset_report.certificate_id,
            })),
        )
        .await?;

        // Outcome and telemetry
        self.checkpoint_with(run, SagaStep::PersistOutcome, Some(&bundle))
            .await?;
        self.complete(run, SagaStep::PersistOutcome, None).await?;

        self.checkpoint_with(run, SagaStep::PublishTelemetry, Some(&bundle))
            .await?;
        self.metrics.increment("telemetry_published_total", 1);
        self.complete(run, SagaStep::PublishTelemetry, None).await?;

        run.execution.finish(SagaStatus::Completed)?;
        self.write_event(
            run,
            LIFECYCLE_STEP,
            EventType::SagaCompleted,
            Some(json!({
                "selectedRegion": run.routing.selected_region,
                "attempts": run.routing.attempts,
                "fallbackUsed": run.routing.fallback_used,
            })),
        )
        .await?;
        self.metrics.increment("saga_completed_total", 1);
        tracing::info!(
            saga_id = %run.saga_id(),
            region = %run.routing.selected_region,
            "Saga completed"
        );

        Ok(SagaRunSuccess {
            greeting: GreetingOutput {
                rendered: bundle.ai_enhancement_report.enhanced_greeting.clone(),
                edition: ENTERPRISE_EDITION.to_string(),
                locale: request.locale.clone(),
                formality: request.formality,
                timestamp: request
                    .include_timestamp
                    .then(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            },
            policy,
            saga_execution: run.execution.clone(),
            routing_decision: run.routing.clone(),
            chaos_report: run.chaos.clone(),
            runbook: RunbookSummary::steady_state(),
            enrichment: bundle,
            incident: IncidentSummary::none(),
        })
    }

    async fn compensate_and_fail(
        &self,
        run: &mut Run<'_>,
        abort: Abort,
    ) -> Result<SagaRunFailure> {
        let compensations = self.planner.compensate(&run.execution.steps);
        for compensation in &compensations {
            self.write_event(
                run,
                &compensation.step,
                EventType::StepCompensated,
                Some(json!({ "message": compensation.message })),
            )
            .await?;
        }
        run.execution.steps.extend(compensations);

        run.execution.finish(SagaStatus::Compensated)?;
        self.write_event(
            run,
            LIFECYCLE_STEP,
            EventType::SagaCompensated,
            Some(json!({ "code": abort.code, "message": abort.message })),
        )
        .await?;

        let region = &run.routing.selected_region;
        self.metrics.increment("saga_compensated_total", 1);
        self.metrics
            .increment(&format!("region_{region}_compensated_total"), 1);
        self.metrics.increment(
            "chaos_injected_faults_total",
            run.chaos.injected_faults.len() as u64,
        );
        tracing::warn!(
            saga_id = %run.saga_id(),
            code = %abort.code,
            "Saga compensated"
        );

        let raised = self
            .incidents
            .raise_incident(IncidentRequest {
                severity: INCIDENT_SEVERITY,
                title: format!("{} during orchestration", abort.code),
                details: abort.message.clone(),
                code: abort.code.as_str().to_string(),
                request_id: Some(run.ctx.request_id.clone()),
                saga_id: Some(run.saga_id()),
            })
            .await?;

        Ok(SagaRunFailure {
            code: abort.code,
            message: abort.message,
            details: abort.details,
            saga_execution: run.execution.clone(),
            routing_decision: run.routing.clone(),
            chaos_report: run.chaos.clone(),
            runbook: RunbookSummary {
                id: raised.runbook.id,
                title: raised.runbook.title,
                actions: raised.runbook.actions,
            },
            enrichment: abort.bundle.unwrap_or_else(EnrichmentBundle::unavailable),
            incident: IncidentSummary::raised(raised.incident.id, raised.incident.severity),
        })
    }

    async fn checkpoint(&self, run: &mut Run<'_>, step: SagaStep) -> StepFlow<()> {
        self.checkpoint_with(run, step, None).await
    }

    /// Aborts with a deadline failure on `step` once the run's budget is spent.
    async fn checkpoint_with(
        &self,
        run: &mut Run<'_>,
        step: SagaStep,
        bundle: Option<&EnrichmentBundle>,
    ) -> StepFlow<()> {
        if run.expired() {
            return Err(self.deadline_exceeded(run, step, bundle).await);
        }
        Ok(())
    }

    /// Runs a collaborator call within the remaining budget.
    async fn bounded<T, F, Fut>(
        &self,
        run: &mut Run<'_>,
        step: SagaStep,
        bundle: Option<&EnrichmentBundle>,
        call: F,
    ) -> StepFlow<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        match run.remaining() {
            None => Ok(call().await),
            Some(left) => match tokio::time::timeout(left, call()).await {
                Ok(value) => Ok(value),
                Err(_) => Err(self.deadline_exceeded(run, step, bundle).await),
            },
        }
    }

    async fn deadline_exceeded(
        &self,
        run: &mut Run<'_>,
        step: SagaStep,
        bundle: Option<&EnrichmentBundle>,
    ) -> Halt {
        let timeout_ms = run.timeout_ms();
        let details = json!({
            "deadlineExceeded": true,
            "timeoutMs": timeout_ms,
            "step": step.as_str(),
        });
        tracing::warn!(
            saga_id = %run.saga_id(),
            step = %step,
            timeout_ms,
            "Saga deadline exceeded"
        );

        if let Err(err) = self.fail(run, step, Some(details.clone())).await {
            return Halt::Infra(err);
        }
        Halt::Abort(Abort {
            code: ErrorCode::ChaosTimeout,
            message: deadline_message(timeout_ms),
            details,
            bundle: bundle.cloned(),
        })
    }

    async fn complete(
        &self,
        run: &mut Run<'_>,
        step: SagaStep,
        payload: Option<Value>,
    ) -> Result<Offset> {
        run.execution
            .record(StepResult::completed(step, step.completed_message(payload.as_ref())));
        self.write_event(run, step.as_str(), EventType::StepCompleted, payload)
            .await
    }

    async fn fail(
        &self,
        run: &mut Run<'_>,
        step: SagaStep,
        payload: Option<Value>,
    ) -> Result<Offset> {
        run.execution
            .record(StepResult::failed(step, step.failed_message(payload.as_ref())));
        self.write_event(run, step.as_str(), EventType::StepFailed, payload)
            .await
    }

    async fn write_event(
        &self,
        run: &Run<'_>,
        step: &str,
        event_type: EventType,
        payload: Option<Value>,
    ) -> Result<Offset> {
        let mut builder = SagaEvent::builder()
            .saga_id(run.saga_id())
            .request_id(run.ctx.request_id.clone())
            .trace_id(run.ctx.trace_id)
            .step(step)
            .event_type(event_type);
        if let Some(payload) = payload {
            builder = builder.payload_raw(payload);
        }
        let offset = self.log.append(builder.build()?).await?;
        tracing::debug!(
            step,
            event_type = event_type.as_str(),
            offset = offset.as_i64(),
            "Saga event appended"
        );
        Ok(offset)
    }
}

fn abort(code: ErrorCode, message: &str, details: Value) -> Halt {
    Halt::Abort(Abort {
        code,
        message: message.to_string(),
        details,
        bundle: None,
    })
}
