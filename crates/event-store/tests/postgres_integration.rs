//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a running Docker
//! daemon, so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use event_store::{
    EventLog, EventLogExt, EventQuery, EventType, NewSagaEvent, Offset, PostgresEventLog,
    SagaEvent, SagaId, TraceId,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresEventLog::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh log with its own pool and an emptied table
async fn get_test_log() -> PostgresEventLog {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE saga_events RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventLog::new(pool)
}

fn new_event(saga_id: SagaId, step: &str, event_type: EventType) -> NewSagaEvent {
    SagaEvent::builder()
        .saga_id(saga_id)
        .request_id("req-pg")
        .trace_id(TraceId::new())
        .step(step)
        .event_type(event_type)
        .payload_raw(serde_json::json!({"selectedRegion": "us-east-1"}))
        .build()
        .unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn append_assigns_offsets_from_one() {
    let log = get_test_log().await;
    let saga_id = SagaId::new();

    assert_eq!(log.latest_offset().await.unwrap(), Offset::initial());

    let first = log
        .append(new_event(saga_id, "ValidateRequestStep", EventType::StepCompleted))
        .await
        .unwrap();
    let second = log
        .append(new_event(saga_id, "RouteRegionStep", EventType::StepCompleted))
        .await
        .unwrap();

    assert_eq!(first, Offset::first());
    assert_eq!(second, Offset::new(2));
    assert_eq!(log.count().await.unwrap(), 2);
    assert_eq!(log.latest_offset().await.unwrap(), Offset::new(2));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn replay_all_roundtrips_event_fields() {
    let log = get_test_log().await;
    let saga_id = SagaId::new();
    let event = new_event(saga_id, "PolicyGateStep", EventType::StepFailed);
    let trace_id = event.trace_id;

    log.append(event).await.unwrap();

    let events = log.replay_all().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].saga_id, saga_id);
    assert_eq!(events[0].trace_id, trace_id);
    assert_eq!(events[0].event_type, EventType::StepFailed);
    assert_eq!(events[0].step, "PolicyGateStep");
    assert_eq!(
        events[0].payload,
        Some(serde_json::json!({"selectedRegion": "us-east-1"}))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn query_filters_and_recent_listing() {
    let log = get_test_log().await;
    let saga_a = SagaId::new();
    let saga_b = SagaId::new();

    log.append(new_event(saga_a, "A", EventType::StepCompleted))
        .await
        .unwrap();
    log.append(new_event(saga_b, "A", EventType::StepFailed))
        .await
        .unwrap();
    log.append(new_event(saga_a, "SagaLifecycle", EventType::SagaCompensated))
        .await
        .unwrap();

    let for_a = log.events_for_saga(saga_a).await.unwrap();
    assert_eq!(for_a.len(), 2);
    assert!(for_a[0].offset < for_a[1].offset);

    let lifecycle = log
        .query(
            EventQuery::new()
                .event_types(vec![EventType::SagaCompensated, EventType::SagaCompleted])
                .from_offset(Offset::new(2)),
        )
        .await
        .unwrap();
    assert_eq!(lifecycle.len(), 1);
    assert_eq!(lifecycle[0].offset, Offset::new(3));

    let recent = log.list_recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].offset, Offset::new(3));
    assert_eq!(recent[1].offset, Offset::new(2));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn concurrent_appends_produce_distinct_offsets() {
    let log = get_test_log().await;
    let mut handles = Vec::new();

    for _ in 0..10 {
        let log = log.clone();
        handles.push(tokio::spawn(async move {
            log.append(new_event(SagaId::new(), "A", EventType::StepCompleted))
                .await
                .unwrap()
        }));
    }

    let mut offsets = Vec::new();
    for handle in handles {
        offsets.push(handle.await.unwrap().as_i64());
    }
    offsets.sort();
    offsets.dedup();
    assert_eq!(offsets.len(), 10);

    let replayed: Vec<i64> = log
        .replay_all()
        .await
        .unwrap()
        .iter()
        .map(|e| e.offset.as_i64())
        .collect();
    assert_eq!(replayed, offsets);
}
