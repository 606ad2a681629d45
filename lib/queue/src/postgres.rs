//! The `sqlx`/Postgres-backed [`DurableQueue`], row-locking via `SELECT ...
//! FOR UPDATE SKIP LOCKED`.

use crate::error::QueueError;
use crate::model::{FlowExecutionPayload, Job};
use crate::queue::DurableQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowforge_core::{ExecId, JobId};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// DDL for the `job_queue` table and its two lookup indexes, exactly as
/// specified: one partial index speeding up the "oldest unlocked row"
/// lease query, one plain index speeding up `cancel_by_exec_id`.
pub const INIT_SQL: &str = r"
CREATE TABLE IF NOT EXISTS job_queue (
    id BIGSERIAL PRIMARY KEY,
    exec_id TEXT NOT NULL,
    payload BYTEA NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    is_locked BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS job_queue_unlocked_created_at_idx
    ON job_queue (created_at) WHERE is_locked = FALSE;
CREATE INDEX IF NOT EXISTS job_queue_exec_id_idx ON job_queue (exec_id);
";

#[derive(FromRow)]
struct JobRow {
    id: i64,
    exec_id: String,
    payload: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl JobRow {
    fn try_into_job(self) -> Result<Job, QueueError> {
        let exec_id = ExecId::from_str(&self.exec_id).map_err(|e| QueueError::Internal {
            reason: format!("malformed exec_id '{}': {e}", self.exec_id),
        })?;
        let payload: FlowExecutionPayload = serde_json::from_slice(&self.payload)?;
        Ok(Job {
            id: JobId(self.id),
            exec_id,
            payload,
            created_at: self.created_at,
        })
    }
}

/// A durable queue backed by a Postgres `job_queue` table.
pub struct PostgresQueue {
    pool: PgPool,
}

impl PostgresQueue {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `job_queue` table and its indexes if they do not already
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Internal`] on any SQL failure.
    pub async fn initialize(&self) -> Result<(), QueueError> {
        sqlx::raw_sql(INIT_SQL)
            .execute(&self.pool)
            .await
            .map_err(QueueError::from)?;
        Ok(())
    }
}

#[async_trait]
impl DurableQueue for PostgresQueue {
    async fn put(&self, payload: FlowExecutionPayload) -> Result<Job, QueueError> {
        let exec_id = payload.exec_id.to_string();
        let bytes = serde_json::to_vec(&payload)?;

        let row: JobRow = sqlx::query_as(
            "INSERT INTO job_queue (exec_id, payload, is_locked)
             VALUES ($1, $2, FALSE)
             RETURNING id, exec_id, payload, created_at",
        )
        .bind(exec_id)
        .bind(bytes)
        .fetch_one(&self.pool)
        .await?;

        row.try_into_job()
    }

    async fn get(&self) -> Result<Job, QueueError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<JobRow> = sqlx::query_as(
            "UPDATE job_queue SET is_locked = TRUE
             WHERE id = (
                 SELECT id FROM job_queue
                 WHERE is_locked = FALSE
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, exec_id, payload, created_at",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(QueueError::NoJobs);
        };

        tx.commit().await?;
        row.try_into_job()
    }

    async fn delete(&self, id: JobId) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM job_queue WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cancel_by_exec_id(&self, exec_id: ExecId) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM job_queue WHERE exec_id = $1")
            .bind(exec_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn relock_stale(
        &self,
        older_than: chrono::Duration,
    ) -> Result<Vec<JobId>, QueueError> {
        // The persisted schema has no separate lock timestamp, so staleness
        // is approximated against `created_at`. This is an operator
        // affordance only; the scheduler never calls it itself.
        let cutoff = Utc::now() - older_than;
        let rows: Vec<(i64,)> = sqlx::query_as(
            "UPDATE job_queue SET is_locked = FALSE
             WHERE is_locked = TRUE AND created_at < $1
             RETURNING id",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| JobId(id)).collect())
    }
}
