//! An in-process reference [`Store`] implementation, used for tests and for
//! driving the worker pool without a SQL backend.

use crate::error::StoreError;
use crate::model::{ApprovalRequest, ApprovalStatus, Execution, ExecutionStatus};
use crate::store::Store;
use async_trait::async_trait;
use chrono::Utc;
use flowforge_core::{ApprovalId, ExecId, FlowId, NamespaceId, UserId};
use flowforge_flow::Flow;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    flows: HashMap<FlowId, Flow>,
    flows_by_slug: HashMap<String, FlowId>,
    executions: HashMap<ExecId, Execution>,
    approvals: HashMap<ApprovalId, ApprovalRequest>,
}

/// An in-memory [`Store`], backed by a single mutex-guarded map set.
///
/// Mirrors the shape of the reference stack's in-memory test doubles for its
/// own `async_trait` storage interfaces: simple, synchronous locking inside
/// `async fn` bodies, since no I/O ever actually suspends here.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_flow(&self, flow: Flow) -> Result<FlowId, StoreError> {
        let id = FlowId::new();
        let mut inner = self.inner.lock().unwrap();
        inner.flows_by_slug.insert(flow.slug.clone(), id);
        inner.flows.insert(id, flow);
        Ok(id)
    }

    async fn update_flow(&self, id: FlowId, flow: Flow) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.flows.contains_key(&id) {
            return Err(StoreError::FlowNotFound { id });
        }
        inner.flows_by_slug.insert(flow.slug.clone(), id);
        inner.flows.insert(id, flow);
        Ok(())
    }

    async fn get_flow_by_slug(&self, slug: &str) -> Result<Option<(FlowId, Flow)>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .flows_by_slug
            .get(slug)
            .and_then(|id| inner.flows.get(id).map(|f| (*id, f.clone()))))
    }

    async fn get_flow(&self, id: FlowId) -> Result<Flow, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .flows
            .get(&id)
            .cloned()
            .ok_or(StoreError::FlowNotFound { id })
    }

    async fn list_scheduled_flows(&self) -> Result<Vec<(FlowId, Flow)>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .flows
            .iter()
            .filter(|(_, f)| f.cron_schedule.is_some())
            .map(|(id, f)| (*id, f.clone()))
            .collect())
    }

    async fn create_execution(&self, execution: Execution) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.executions.insert(execution.exec_id, execution);
        Ok(())
    }

    async fn get_execution(&self, exec_id: ExecId) -> Result<Execution, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .executions
            .get(&exec_id)
            .cloned()
            .ok_or(StoreError::ExecutionNotFound { exec_id })
    }

    async fn set_current_action(
        &self,
        exec_id: ExecId,
        action_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let execution = inner
            .executions
            .get_mut(&exec_id)
            .ok_or(StoreError::ExecutionNotFound { exec_id })?;
        execution.current_action_id = Some(action_id.to_string());
        if execution.status == ExecutionStatus::Pending {
            execution.status = ExecutionStatus::Running;
        }
        Ok(())
    }

    async fn finish_execution(
        &self,
        exec_id: ExecId,
        status: ExecutionStatus,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let execution = inner
            .executions
            .get_mut(&exec_id)
            .ok_or(StoreError::ExecutionNotFound { exec_id })?;
        if execution.status.is_terminal() {
            return Err(StoreError::Conflict {
                reason: format!("execution {exec_id} is already in a terminal state"),
            });
        }
        execution.status = status;
        execution.error = error;
        execution.ended_at = Some(Utc::now());
        Ok(())
    }

    async fn find_open_approval(
        &self,
        exec_id: ExecId,
        action_id: &str,
    ) -> Result<Option<ApprovalRequest>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .approvals
            .values()
            .find(|a| {
                a.exec_id == exec_id
                    && a.action_id == action_id
                    && a.status != ApprovalStatus::Rejected
            })
            .cloned())
    }

    async fn get_approval(&self, id: ApprovalId) -> Result<ApprovalRequest, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .approvals
            .get(&id)
            .cloned()
            .ok_or(StoreError::ApprovalNotFound { id })
    }

    async fn request_approval_tx(
        &self,
        exec_id: ExecId,
        namespace_id: NamespaceId,
        action_id: &str,
    ) -> Result<ApprovalRequest, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.executions.contains_key(&exec_id) {
            return Err(StoreError::ExecutionNotFound { exec_id });
        }
        if inner
            .approvals
            .values()
            .any(|a| a.exec_id == exec_id && a.action_id == action_id && a.status != ApprovalStatus::Rejected)
        {
            return Err(StoreError::Conflict {
                reason: format!(
                    "an open approval already exists for execution {exec_id} action {action_id}"
                ),
            });
        }

        let request = ApprovalRequest::new(exec_id, action_id, namespace_id);
        inner.approvals.insert(request.uuid, request.clone());
        Ok(request)
    }

    async fn process_approval_decision_tx(
        &self,
        approval_id: ApprovalId,
        namespace_id: NamespaceId,
        decided_by: UserId,
        status: ApprovalStatus,
        cancellation_note: Option<String>,
    ) -> Result<(ApprovalRequest, ExecId), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let approval = inner
            .approvals
            .get_mut(&approval_id)
            .ok_or(StoreError::ApprovalNotFound { id: approval_id })?;

        if approval.namespace_id != namespace_id {
            return Err(StoreError::ApprovalNotFound { id: approval_id });
        }
        if approval.status != ApprovalStatus::Pending {
            return Err(StoreError::Conflict {
                reason: format!("approval {approval_id} has already been decided"),
            });
        }

        approval.status = status;
        approval.decided_by = Some(decided_by);
        approval.decided_at = Some(Utc::now());
        let decided = approval.clone();
        let exec_id = decided.exec_id;

        if status == ApprovalStatus::Rejected {
            if let Some(execution) = inner.executions.get_mut(&exec_id) {
                if !execution.status.is_terminal() {
                    execution.status = ExecutionStatus::Cancelled;
                    execution.error = cancellation_note;
                    execution.ended_at = Some(Utc::now());
                }
            }
        }

        Ok((decided, exec_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowforge_flow::Flow;

    fn flow_fixture(slug: &str) -> Flow {
        Flow {
            slug: slug.to_string(),
            name: "Test".to_string(),
            description: None,
            checksum: "abc".to_string(),
            cron_schedule: None,
            inputs: vec![],
            actions: vec![],
        }
    }

    #[tokio::test]
    async fn create_and_fetch_flow_by_slug() {
        let store = InMemoryStore::new();
        let id = store.create_flow(flow_fixture("f1")).await.unwrap();

        let (looked_up_id, flow) = store.get_flow_by_slug("f1").await.unwrap().unwrap();
        assert_eq!(looked_up_id, id);
        assert_eq!(flow.slug, "f1");
    }

    #[tokio::test]
    async fn request_approval_then_duplicate_conflicts() {
        let store = InMemoryStore::new();
        let exec_id = ExecId::new();
        let ns = NamespaceId::new();
        store
            .create_execution(Execution::new(exec_id, FlowId::new(), ns))
            .await
            .unwrap();

        store.request_approval_tx(exec_id, ns, "deploy").await.unwrap();
        let second = store.request_approval_tx(exec_id, ns, "deploy").await;
        assert!(matches!(second, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn reject_cancels_execution_with_note() {
        let store = InMemoryStore::new();
        let exec_id = ExecId::new();
        let ns = NamespaceId::new();
        store
            .create_execution(Execution::new(exec_id, FlowId::new(), ns))
            .await
            .unwrap();
        let request = store.request_approval_tx(exec_id, ns, "deploy").await.unwrap();

        let (decided, returned_exec_id) = store
            .process_approval_decision_tx(
                request.uuid,
                ns,
                UserId::new(),
                ApprovalStatus::Rejected,
                Some("denied".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(decided.status, ApprovalStatus::Rejected);
        assert_eq!(returned_exec_id, exec_id);

        let execution = store.get_execution(exec_id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Cancelled);
        assert_eq!(execution.error.as_deref(), Some("denied"));
    }

    #[tokio::test]
    async fn finish_execution_rejects_second_terminal_transition() {
        let store = InMemoryStore::new();
        let exec_id = ExecId::new();
        let ns = NamespaceId::new();
        store
            .create_execution(Execution::new(exec_id, FlowId::new(), ns))
            .await
            .unwrap();

        store
            .finish_execution(exec_id, ExecutionStatus::Completed, None)
            .await
            .unwrap();
        let second = store
            .finish_execution(exec_id, ExecutionStatus::Errored, Some("boom".into()))
            .await;
        assert!(matches!(second, Err(StoreError::Conflict { .. })));
    }
}
