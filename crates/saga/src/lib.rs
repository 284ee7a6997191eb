//! Saga engine for request orchestration.
//!
//! One saga run drives a validated request through a fixed sequence of
//! steps, appending one event per step transition to the event log:
//!
//! 1. ValidateRequest
//! 2. RouteRegion (deterministic partition fault may switch to a fallback region)
//! 3. PolicyGate
//! 4. GenerateGreeting (deterministic timeout fault)
//! 5. EnhanceGreeting, ComputeSentiment, CalculateEsgOffset, AssessMoat
//! 6. PersistEnrichmentArtifacts
//! 7. PersistOutcome
//! 8. PublishTelemetry
//!
//! If any step fails, previously completed steps are compensated in reverse
//! order, the saga ends `compensated` and an incident is raised.

pub mod chaos;
pub mod compensation;
pub mod engine;
pub mod error;
pub mod execution;
pub mod outcome;
pub mod services;
pub mod state;
pub mod steps;

pub use chaos::{ChaosDecision, ChaosInput, DeterministicFaultInjector};
pub use compensation::CompensationPlanner;
pub use engine::{SagaEngine, SagaRunContext};
pub use error::{Result, SagaError};
pub use execution::{SagaExecution, StepResult};
pub use outcome::{
    ChaosReport, GreetingOutput, IncidentSummary, RoutingDecision, RunbookSummary, SagaRunFailure,
    SagaRunResult, SagaRunSuccess,
};
pub use services::{
    DeterministicEnrichmentPipeline, EnrichmentContext, EnrichmentError, EnrichmentLedgers,
    EnrichmentPipeline, IncidentRecord, IncidentRequest, IncidentSink, InMemoryMetrics,
    MetricsSink, MetricsSnapshot, OperationsService, RaisedIncident, RunbookGenerationRecord,
    RunbookRecord,
};
pub use state::{SagaStatus, StepStatus};
pub use steps::{LIFECYCLE_STEP, SagaStep};
