//! Human-approval checkpoints: request, decide, and resume.
//!
//! The coordinator's cache is advisory only -- a short-TTL lookup that
//! saves a duplicate `RequestApprovalTx` round trip, in the spirit of the
//! originating system's Redis-backed approval cache, but kept in-process
//! since no external cache is in scope here.

use chrono::{DateTime, Duration, Utc};
use flowforge_core::{ApprovalId, ExecId, NamespaceId, UserId};
use flowforge_queue::{DurableQueue, FlowExecutionPayload};
use flowforge_store::{ApprovalRequest, ApprovalStatus, Store, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

const CACHE_TTL: Duration = Duration::hours(1);

struct CacheEntry {
    approval: ApprovalRequest,
    /// The payload that was in flight when the gate was hit, retained so
    /// `decide()` can resume with the same inputs, trigger type, and
    /// triggering user rather than reconstructing a new one from scratch.
    original_payload: FlowExecutionPayload,
    expires_at: DateTime<Utc>,
}

/// Requests and decides approval checkpoints, re-enqueuing the resume job
/// on approval and cancelling the execution on rejection.
pub struct ApprovalCoordinator {
    store: std::sync::Arc<dyn Store>,
    queue: std::sync::Arc<dyn DurableQueue>,
    cache: Mutex<HashMap<ExecId, CacheEntry>>,
}

impl ApprovalCoordinator {
    /// Builds a coordinator over the given store and queue.
    #[must_use]
    pub fn new(store: std::sync::Arc<dyn Store>, queue: std::sync::Arc<dyn DurableQueue>) -> Self {
        Self {
            store,
            queue,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached_pending(&self, exec_id: ExecId) -> Option<ApprovalRequest> {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(&exec_id) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.approval.clone()),
            Some(_) => {
                cache.remove(&exec_id);
                None
            }
            None => None,
        }
    }

    /// Looks up the payload retained from the request that opened this
    /// execution's approval gate, ignoring TTL expiry -- `decide()` needs
    /// this regardless of how long the gate has been open.
    fn cached_original_payload(&self, exec_id: ExecId) -> Option<FlowExecutionPayload> {
        self.cache
            .lock()
            .unwrap()
            .get(&exec_id)
            .map(|entry| entry.original_payload.clone())
    }

    fn cache_put(
        &self,
        exec_id: ExecId,
        approval: ApprovalRequest,
        original_payload: FlowExecutionPayload,
    ) {
        self.cache.lock().unwrap().insert(
            exec_id,
            CacheEntry {
                approval,
                original_payload,
                expires_at: Utc::now() + CACHE_TTL,
            },
        );
    }

    /// Requests approval for `(exec_id, action_id)`, consulting the cache
    /// first to avoid a duplicate insert when a worker re-enters the same
    /// checkpoint before its prior request is visible elsewhere.
    ///
    /// `in_flight_payload` is the payload the worker leased to reach this
    /// checkpoint; it is retained so a later approval can resume the flow
    /// with the same inputs, trigger type, and triggering user.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the underlying transaction.
    pub async fn request_approval(
        &self,
        exec_id: ExecId,
        namespace_id: NamespaceId,
        action_id: &str,
        in_flight_payload: &FlowExecutionPayload,
    ) -> Result<ApprovalRequest, StoreError> {
        if let Some(cached) = self.cached_pending(exec_id) {
            if cached.status == ApprovalStatus::Pending && cached.action_id == action_id {
                return Ok(cached);
            }
        }

        let approval = self
            .store
            .request_approval_tx(exec_id, namespace_id, action_id)
            .await?;
        self.cache_put(exec_id, approval.clone(), in_flight_payload.clone());
        Ok(approval)
    }

    /// Decides an approval. On approve, re-enqueues a resume job carrying
    /// the same payload the worker leased to reach this checkpoint --
    /// same `input`, `trigger_type`, and triggering `user_id` -- with only
    /// `starting_action_idx` advanced to the approved action's index
    /// within `flow`. On reject, the store transaction also cancels the
    /// execution; no resume job is enqueued.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the underlying transaction, or
    /// returns [`StoreError::Internal`] if the approval's action id is not
    /// found in `flow`, or if no in-flight payload was retained for this
    /// execution (the gate was never requested through this coordinator).
    pub async fn decide(
        &self,
        approval_id: ApprovalId,
        namespace_id: NamespaceId,
        decided_by: UserId,
        status: ApprovalStatus,
        cancellation_note: Option<String>,
        flow: &flowforge_flow::Flow,
    ) -> Result<(ApprovalRequest, ExecId), StoreError> {
        let (approval, exec_id) = self
            .store
            .process_approval_decision_tx(
                approval_id,
                namespace_id,
                decided_by,
                status,
                cancellation_note,
            )
            .await?;

        if status == ApprovalStatus::Approved {
            let original_payload =
                self.cached_original_payload(exec_id)
                    .ok_or_else(|| StoreError::Internal {
                        reason: format!(
                            "no in-flight payload retained for execution '{exec_id}'; cannot resume"
                        ),
                    })?;

            let resume_idx =
                flow.action_index(&approval.action_id)
                    .ok_or_else(|| StoreError::Internal {
                        reason: format!(
                            "approved action '{}' not found in flow '{}'",
                            approval.action_id, flow.slug
                        ),
                    })?;

            let payload = FlowExecutionPayload {
                workflow: flow.clone(),
                starting_action_idx: resume_idx,
                exec_id,
                namespace_id,
                ..original_payload.clone()
            };
            self.queue
                .put(payload)
                .await
                .map_err(|e| StoreError::Internal {
                    reason: e.to_string(),
                })?;

            self.cache_put(exec_id, approval.clone(), original_payload);
        }

        Ok((approval, exec_id))
    }
}
