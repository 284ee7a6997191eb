use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row, types::Json};

use crate::{ProjectionSnapshot, Result, store::ProjectionStore};

/// PostgreSQL-backed projection store.
///
/// The snapshot lives in the single row `id = 1` of `projection_snapshots`.
#[derive(Clone)]
pub struct PostgresProjectionStore {
    pool: PgPool,
}

impl PostgresProjectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectionStore for PostgresProjectionStore {
    async fn load(&self) -> Result<ProjectionSnapshot> {
        let row = sqlx::query(
            r#"
            SELECT projection_version, replay_checkpoint, replay_duration_ms, checksum, counters
            FROM projection_snapshots
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(ProjectionSnapshot::initial());
        };

        let counters: Json<BTreeMap<String, u64>> = row.try_get("counters")?;
        Ok(ProjectionSnapshot {
            projection_version: row.try_get::<i64, _>("projection_version")?.max(0) as u64,
            replay_checkpoint: row.try_get::<i64, _>("replay_checkpoint")?.max(0) as u64,
            replay_duration_ms: row.try_get::<i64, _>("replay_duration_ms")?.max(0) as u64,
            checksum: row.try_get("checksum")?,
            counters: counters.0,
        })
    }

    #[tracing::instrument(skip(self, snapshot), fields(version = snapshot.projection_version))]
    async fn save(&self, snapshot: &ProjectionSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projection_snapshots
                (id, projection_version, replay_checkpoint, replay_duration_ms, checksum, counters, updated_at)
            VALUES (1, $1, $2, $3, $4, $5, NOW())
            ON CONFLICT (id) DO UPDATE SET
                projection_version = EXCLUDED.projection_version,
                replay_checkpoint = EXCLUDED.replay_checkpoint,
                replay_duration_ms = EXCLUDED.replay_duration_ms,
                checksum = EXCLUDED.checksum,
                counters = EXCLUDED.counters,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(snapshot.projection_version as i64)
        .bind(snapshot.replay_checkpoint as i64)
        .bind(snapshot.replay_duration_ms as i64)
        .bind(&snapshot.checksum)
        .bind(Json(&snapshot.counters))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
