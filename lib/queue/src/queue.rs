//! The [`DurableQueue`] trait.

use crate::error::QueueError;
use crate::model::{FlowExecutionPayload, Job};
use async_trait::async_trait;
use flowforge_core::ExecId;

/// A durable, row-locked FIFO queue of execution jobs.
///
/// Unlike the rest of the [`Store`](flowforge_store::Store) surface, the
/// `job_queue` schema and its lease transaction are explicitly part of this
/// engine's scope, so this trait is backed by both an in-memory reference
/// implementation and a `sqlx`/Postgres implementation using `SELECT ... FOR
/// UPDATE SKIP LOCKED`.
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Inserts a new, unlocked row.
    async fn put(&self, payload: FlowExecutionPayload) -> Result<Job, QueueError>;

    /// Leases and returns the oldest unlocked row, marking it locked.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NoJobs`] if every row is currently locked or
    /// the queue is empty -- an expected control signal, not a failure.
    async fn get(&self) -> Result<Job, QueueError>;

    /// Deletes a row by id, called once a worker has finished processing it
    /// (successfully, or with a terminal failure).
    async fn delete(&self, id: flowforge_core::JobId) -> Result<(), QueueError>;

    /// Deletes every row (locked or not) for the given execution.
    async fn cancel_by_exec_id(&self, exec_id: ExecId) -> Result<(), QueueError>;

    /// Unlocks rows that have been locked for longer than `older_than`
    /// without being deleted, for use by an out-of-scope external janitor
    /// reconciling crashed workers. The scheduler itself never calls this.
    async fn relock_stale(
        &self,
        older_than: chrono::Duration,
    ) -> Result<Vec<flowforge_core::JobId>, QueueError>;
}
