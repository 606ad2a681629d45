//! Execution and approval record types.

use chrono::{DateTime, Utc};
use flowforge_core::{ApprovalId, ExecId, FlowId, NamespaceId, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an [`Execution`]. `Completed`, `Errored`, and
/// `Cancelled` are terminal; no transition out of a terminal state is
/// permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Enqueued but not yet leased by a worker.
    Pending,
    /// Leased and actively (or suspended mid-way) running.
    Running,
    /// Finished; every action succeeded.
    Completed,
    /// Finished; an action failed.
    Errored,
    /// Finished; cancelled externally or via approval rejection.
    Cancelled,
}

impl ExecutionStatus {
    /// Returns whether this status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Errored | ExecutionStatus::Cancelled
        )
    }
}

/// One concrete run of a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Opaque execution identifier, also used as the log stream key.
    pub exec_id: ExecId,
    /// The flow this execution runs.
    pub flow_id: FlowId,
    /// Owning namespace.
    pub namespace_id: NamespaceId,
    /// Current lifecycle status.
    pub status: ExecutionStatus,
    /// The action currently executing (or last attempted), if any.
    pub current_action_id: Option<String>,
    /// Terminal error message, set when `status == Errored` or `Cancelled`
    /// via approval rejection.
    pub error: Option<String>,
    /// When this execution was created.
    pub started_at: DateTime<Utc>,
    /// When this execution reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Execution {
    /// Creates a new, pending execution record.
    #[must_use]
    pub fn new(exec_id: ExecId, flow_id: FlowId, namespace_id: NamespaceId) -> Self {
        Self {
            exec_id,
            flow_id,
            namespace_id,
            status: ExecutionStatus::Pending,
            current_action_id: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// Decision status of an [`ApprovalRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved; the suspended execution may resume.
    Approved,
    /// Rejected; the owning execution is cancelled.
    Rejected,
}

/// A pending or decided human-approval checkpoint for one action of one
/// execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique identifier for this approval request.
    pub uuid: ApprovalId,
    /// The execution this approval gates.
    pub exec_id: ExecId,
    /// The action id this approval gates.
    pub action_id: String,
    /// Owning namespace.
    pub namespace_id: NamespaceId,
    /// Current decision status.
    pub status: ApprovalStatus,
    /// Who requested the approval, if known.
    pub requested_by: Option<UserId>,
    /// Who decided the approval, once decided.
    pub decided_by: Option<UserId>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was decided, once decided.
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    /// Creates a new, pending approval request.
    #[must_use]
    pub fn new(exec_id: ExecId, action_id: impl Into<String>, namespace_id: NamespaceId) -> Self {
        Self {
            uuid: ApprovalId::new(),
            exec_id,
            action_id: action_id.into(),
            namespace_id,
            status: ApprovalStatus::Pending,
            requested_by: None,
            decided_by: None,
            created_at: Utc::now(),
            decided_at: None,
        }
    }
}
