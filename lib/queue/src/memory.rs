//! An in-process reference [`DurableQueue`], used for scheduler tests.

use crate::error::QueueError;
use crate::model::{FlowExecutionPayload, Job};
use crate::queue::DurableQueue;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use flowforge_core::{ExecId, JobId};
use std::sync::Mutex;

struct Row {
    job: Job,
    is_locked: bool,
    locked_at: Option<chrono::DateTime<Utc>>,
}

/// An in-memory [`DurableQueue`], FIFO-ordered by insertion.
#[derive(Default)]
pub struct InMemoryQueue {
    rows: Mutex<Vec<Row>>,
    next_id: Mutex<i64>,
}

impl InMemoryQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableQueue for InMemoryQueue {
    async fn put(&self, payload: FlowExecutionPayload) -> Result<Job, QueueError> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let job = Job {
            id: JobId(*next_id),
            exec_id: payload.exec_id,
            payload,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(Row {
            job: job.clone(),
            is_locked: false,
            locked_at: None,
        });
        Ok(job)
    }

    async fn get(&self) -> Result<Job, QueueError> {
        let mut rows = self.rows.lock().unwrap();
        let candidate = rows
            .iter_mut()
            .filter(|r| !r.is_locked)
            .min_by_key(|r| r.job.created_at);

        match candidate {
            Some(row) => {
                row.is_locked = true;
                row.locked_at = Some(Utc::now());
                Ok(row.job.clone())
            }
            None => Err(QueueError::NoJobs),
        }
    }

    async fn delete(&self, id: JobId) -> Result<(), QueueError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|r| r.job.id != id);
        Ok(())
    }

    async fn cancel_by_exec_id(&self, exec_id: ExecId) -> Result<(), QueueError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|r| r.job.exec_id != exec_id);
        Ok(())
    }

    async fn relock_stale(&self, older_than: Duration) -> Result<Vec<JobId>, QueueError> {
        let mut rows = self.rows.lock().unwrap();
        let cutoff = Utc::now() - older_than;
        let mut unlocked = Vec::new();
        for row in rows.iter_mut() {
            if row.is_locked && row.locked_at.is_some_and(|t| t < cutoff) {
                row.is_locked = false;
                row.locked_at = None;
                unlocked.push(row.job.id);
            }
        }
        Ok(unlocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowforge_core::{NamespaceId, UserId};
    use flowforge_flow::Flow;
    use std::collections::BTreeMap;

    fn payload() -> FlowExecutionPayload {
        FlowExecutionPayload {
            workflow: Flow {
                slug: "f".to_string(),
                name: "F".to_string(),
                description: None,
                checksum: String::new(),
                cron_schedule: None,
                inputs: vec![],
                actions: vec![],
            },
            input: BTreeMap::new(),
            starting_action_idx: 0,
            exec_id: ExecId::new(),
            namespace_id: NamespaceId::new(),
            trigger_type: crate::model::TriggerType::Manual,
            user_id: UserId::new(),
        }
    }

    #[tokio::test]
    async fn get_leases_oldest_unlocked_fifo() {
        let queue = InMemoryQueue::new();
        let first = queue.put(payload()).await.unwrap();
        let _second = queue.put(payload()).await.unwrap();

        let leased = queue.get().await.unwrap();
        assert_eq!(leased.id, first.id);
    }

    #[tokio::test]
    async fn get_returns_no_jobs_when_all_locked() {
        let queue = InMemoryQueue::new();
        queue.put(payload()).await.unwrap();
        queue.get().await.unwrap();

        let result = queue.get().await;
        assert!(matches!(result, Err(QueueError::NoJobs)));
    }

    #[tokio::test]
    async fn cancel_by_exec_id_removes_locked_and_unlocked_rows() {
        let queue = InMemoryQueue::new();
        let p = payload();
        let exec_id = p.exec_id;
        queue.put(p).await.unwrap();
        queue.get().await.unwrap();

        queue.cancel_by_exec_id(exec_id).await.unwrap();
        let result = queue.get().await;
        assert!(matches!(result, Err(QueueError::NoJobs)));
    }

    #[tokio::test]
    async fn relock_stale_unlocks_rows_past_the_threshold() {
        let queue = InMemoryQueue::new();
        queue.put(payload()).await.unwrap();
        let leased = queue.get().await.unwrap();

        let relocked = queue.relock_stale(Duration::seconds(-1)).await.unwrap();
        assert_eq!(relocked, vec![leased.id]);

        // Now available again.
        queue.get().await.unwrap();
    }
}
