//! HTTP API server for the saga orchestrator.
//!
//! Exposes orchestration, projection replay, event and saga inspection and
//! the incident desk as REST endpoints, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::Application;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(app: Application, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/v2/orchestrate", post(routes::orchestrate::execute))
        .route("/v2/replay", post(routes::projection::replay))
        .route("/v2/projection", get(routes::projection::get))
        .route("/v2/events", get(routes::events::list))
        .route("/v2/sagas/{id}", get(routes::sagas::get))
        .route("/v2/incidents", get(routes::incidents::list))
        .route("/v2/incidents/simulate", post(routes::incidents::simulate))
        .with_state(app)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
