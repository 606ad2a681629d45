//! The [`Store`] trait: persisted flows, executions, approvals, and
//! namespaces, plus the two transactional approval operations.

use crate::error::StoreError;
use crate::model::{ApprovalRequest, ApprovalStatus, Execution, ExecutionStatus};
use async_trait::async_trait;
use flowforge_core::{ApprovalId, ExecId, FlowId, NamespaceId, UserId};
use flowforge_flow::Flow;

/// Persisted entities backing the flow engine: flows, executions, and
/// approvals.
///
/// Flow/execution/approval/namespace table DDL is out of scope for this
/// engine (see the purpose & scope notes); this trait is the full surface a
/// caller needs, with an in-memory reference implementation provided for
/// tests. A production deployment backs the same trait with a SQL store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new flow record, returning its assigned id.
    async fn create_flow(&self, flow: Flow) -> Result<FlowId, StoreError>;

    /// Replaces the body of an existing flow record.
    async fn update_flow(&self, id: FlowId, flow: Flow) -> Result<(), StoreError>;

    /// Looks up a flow record by its stable slug.
    async fn get_flow_by_slug(&self, slug: &str) -> Result<Option<(FlowId, Flow)>, StoreError>;

    /// Looks up a flow record by id.
    async fn get_flow(&self, id: FlowId) -> Result<Flow, StoreError>;

    /// Lists every flow with a non-null `cron_schedule`, for the cron
    /// trigger's tick evaluation.
    async fn list_scheduled_flows(&self) -> Result<Vec<(FlowId, Flow)>, StoreError>;

    /// Inserts a new execution record.
    async fn create_execution(&self, execution: Execution) -> Result<(), StoreError>;

    /// Fetches an execution record by id.
    async fn get_execution(&self, exec_id: ExecId) -> Result<Execution, StoreError>;

    /// Updates `current_action_id`, called before each action runs.
    /// Transitions a `Pending` execution to `Running` on first call, the
    /// `pending -> running` edge of the execution state machine.
    async fn set_current_action(
        &self,
        exec_id: ExecId,
        action_id: &str,
    ) -> Result<(), StoreError>;

    /// Transitions an execution to a terminal status. No-op error if the
    /// execution is already terminal.
    async fn finish_execution(
        &self,
        exec_id: ExecId,
        status: ExecutionStatus,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    /// Looks up the most recent non-rejected approval for `(exec_id,
    /// action_id)`, if any.
    async fn find_open_approval(
        &self,
        exec_id: ExecId,
        action_id: &str,
    ) -> Result<Option<ApprovalRequest>, StoreError>;

    /// Fetches an approval record by id.
    async fn get_approval(&self, id: ApprovalId) -> Result<ApprovalRequest, StoreError>;

    /// Atomically verifies the execution exists and inserts a pending
    /// approval request for `(exec_id, action_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ExecutionNotFound`] if the execution does not
    /// exist, or [`StoreError::Conflict`] if an open approval already
    /// exists for this `(exec_id, action_id)` pair.
    async fn request_approval_tx(
        &self,
        exec_id: ExecId,
        namespace_id: NamespaceId,
        action_id: &str,
    ) -> Result<ApprovalRequest, StoreError>;

    /// Atomically transitions an approval to `approved` or `rejected`. On
    /// reject with `cancellation_note`, also transitions the owning
    /// execution to `Cancelled` with that note as its error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ApprovalNotFound`] if `approval_id` is unknown,
    /// or [`StoreError::Conflict`] if the approval was already decided.
    async fn process_approval_decision_tx(
        &self,
        approval_id: ApprovalId,
        namespace_id: NamespaceId,
        decided_by: UserId,
        status: ApprovalStatus,
        cancellation_note: Option<String>,
    ) -> Result<(ApprovalRequest, ExecId), StoreError>;
}
