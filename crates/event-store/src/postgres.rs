use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventQuery, EventStoreError, EventType, NewSagaEvent, Offset, Result, SagaEvent, SagaId,
    TraceId,
    store::{EventLog, EventStream},
};

/// Advisory lock key serializing appends so offsets commit in order.
const APPEND_LOCK_KEY: i64 = 0x5A6A_0001;

const SELECT_COLUMNS: &str =
    "SELECT event_offset, timestamp, saga_id, request_id, trace_id, step, event_type, payload FROM saga_events";

/// PostgreSQL-backed event log.
///
/// Offsets come from a `BIGSERIAL` column. Appends take a transaction-scoped
/// advisory lock so a later offset is never visible before an earlier one.
#[derive(Clone)]
pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    /// Creates a new PostgreSQL event log.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations for every store in the workspace.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<SagaEvent> {
        let event_type: String = row.try_get("event_type")?;

        Ok(SagaEvent {
            offset: Offset::new(row.try_get("event_offset")?),
            timestamp: row.try_get("timestamp")?,
            saga_id: SagaId::from_uuid(row.try_get::<Uuid, _>("saga_id")?),
            request_id: row.try_get("request_id")?,
            trace_id: TraceId::from(row.try_get::<Uuid, _>("trace_id")?),
            step: row.try_get("step")?,
            event_type: event_type.parse::<EventType>()?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl EventLog for PostgresEventLog {
    #[tracing::instrument(skip(self, event), fields(step = %event.step, event_type = %event.event_type))]
    async fn append(&self, event: NewSagaEvent) -> Result<Offset> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let offset: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO saga_events (timestamp, saga_id, request_id, trace_id, step, event_type, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING event_offset
            "#,
        )
        .bind(event.timestamp)
        .bind(event.saga_id.as_uuid())
        .bind(&event.request_id)
        .bind(event.trace_id.as_uuid())
        .bind(&event.step)
        .bind(event.event_type.as_str())
        .bind(&event.payload)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        metrics::counter!("event_log_appends_total").increment(1);
        Ok(Offset::new(offset))
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saga_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn latest_offset(&self) -> Result<Offset> {
        let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(event_offset) FROM saga_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(latest.map(Offset::new).unwrap_or(Offset::initial()))
    }

    async fn replay_all(&self) -> Result<Vec<SagaEvent>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY event_offset ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        // Rows are fetched up front so the stream does not borrow the pool.
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY event_offset ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(EventStoreError::Database)?;

        let stream = stream::iter(rows.into_iter().map(Self::row_to_event));
        Ok(Box::pin(stream))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<SagaEvent>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} ORDER BY event_offset DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn query(&self, query: EventQuery) -> Result<Vec<SagaEvent>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.saga_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND saga_id = ${param_count}"));
        }
        if query.request_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND request_id = ${param_count}"));
        }
        if query.event_types.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_type = ANY(${param_count})"));
        }
        if query.from_offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_offset >= ${param_count}"));
        }
        if query.to_offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_offset <= ${param_count}"));
        }

        sql.push_str(" ORDER BY event_offset ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(saga_id) = query.saga_id {
            sqlx_query = sqlx_query.bind(saga_id.as_uuid());
        }
        if let Some(request_id) = query.request_id {
            sqlx_query = sqlx_query.bind(request_id);
        }
        if let Some(event_types) = query.event_types {
            let names: Vec<String> = event_types.iter().map(|t| t.as_str().to_string()).collect();
            sqlx_query = sqlx_query.bind(names);
        }
        if let Some(from) = query.from_offset {
            sqlx_query = sqlx_query.bind(from.as_i64());
        }
        if let Some(to) = query.to_offset {
            sqlx_query = sqlx_query.bind(to.as_i64());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }
}
