//! PostgreSQL integration tests for the projection store and replay.
//!
//! Requires Docker; ignored by default. Run with:
//!
//! ```bash
//! cargo test -p projections --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use event_store::{EventLog, EventType, PostgresEventLog, SagaEvent, SagaId, TraceId};
use projections::{
    PostgresProjectionStore, ProjectionReplayService, ProjectionSnapshot, ProjectionStore,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

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

async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE saga_events, projection_snapshots RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn load_defaults_to_initial_snapshot() {
    let store = PostgresProjectionStore::new(get_test_pool().await);
    assert_eq!(store.load().await.unwrap(), ProjectionSnapshot::initial());
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn replay_persists_versioned_snapshots() {
    let pool = get_test_pool().await;
    let log = PostgresEventLog::new(pool.clone());
    for event_type in [EventType::StepCompleted, EventType::SagaCompleted] {
        let event = SagaEvent::builder()
            .saga_id(SagaId::new())
            .request_id("req-pg")
            .trace_id(TraceId::new())
            .step("SagaLifecycle")
            .event_type(event_type)
            .build()
            .unwrap();
        log.append(event).await.unwrap();
    }

    let store = PostgresProjectionStore::new(pool);
    let service = ProjectionReplayService::new(Arc::new(log), Arc::new(store.clone()));

    let first = service.replay().await.unwrap();
    let second = service.replay().await.unwrap();

    assert_eq!(first.projection_version, 1);
    assert_eq!(second.projection_version, 2);
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(second.replay_checkpoint, 2);
    assert_eq!(store.load().await.unwrap(), second);
}
