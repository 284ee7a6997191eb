use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    IdempotencyError, IdempotencyRecord, Reservation, Result, store::IdempotencyStore,
};

/// PostgreSQL-backed idempotency ledger.
///
/// Expects the `idempotency_records` table from the workspace migrations.
#[derive(Clone)]
pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

impl PostgresIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: PgRow) -> Result<IdempotencyRecord> {
        Ok(IdempotencyRecord {
            key: row.try_get("idempotency_key")?,
            request_hash: row.try_get("request_hash")?,
            response: row.try_get("response_json")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl IdempotencyStore for PostgresIdempotencyStore {
    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let row = sqlx::query(
            r#"
            SELECT idempotency_key, request_hash, response_json, created_at
            FROM idempotency_records
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    #[tracing::instrument(skip(self, request_hash))]
    async fn reserve(
        &self,
        key: &str,
        request_hash: &str,
        stale_after: Duration,
    ) -> Result<Reservation> {
        loop {
            // Inserts a pending row, or takes over one whose owner is gone.
            let acquired = sqlx::query(
                r#"
                INSERT INTO idempotency_records (idempotency_key, request_hash, response_json, created_at)
                VALUES ($1, $2, NULL, NOW())
                ON CONFLICT (idempotency_key) DO UPDATE
                    SET request_hash = EXCLUDED.request_hash,
                        created_at = EXCLUDED.created_at
                    WHERE idempotency_records.response_json IS NULL
                      AND idempotency_records.created_at <= NOW() - make_interval(secs => $3)
                RETURNING idempotency_key
                "#,
            )
            .bind(key)
            .bind(request_hash)
            .bind(stale_after.as_secs_f64())
            .fetch_optional(&self.pool)
            .await?;

            if acquired.is_some() {
                return Ok(Reservation::Acquired);
            }
            // The holder may release between the insert and this read.
            if let Some(record) = self.find(key).await? {
                return Ok(Reservation::Existing(record));
            }
        }
    }

    #[tracing::instrument(skip(self, request_hash, response))]
    async fn complete(&self, key: &str, request_hash: &str, response: Value) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE idempotency_records
            SET response_json = $3
            WHERE idempotency_key = $1
              AND request_hash = $2
              AND response_json IS NULL
            "#,
        )
        .bind(key)
        .bind(request_hash)
        .bind(&response)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(IdempotencyError::ReservationLost(key.to_string()));
        }
        metrics::counter!("idempotency_records_total").increment(1);
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM idempotency_records
            WHERE idempotency_key = $1 AND response_json IS NULL
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
