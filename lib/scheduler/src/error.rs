//! Errors from the executor pipeline, cron trigger, and worker pool.
//!
//! `NoJobs` and `PendingApproval` are ordinary control-flow values a caller
//! matches on -- never logged at `error` level, per the error-kind table.

use flowforge_core::ExecId;
use std::fmt;

/// Errors raised while running a single action.
#[derive(Debug)]
pub enum ActionError {
    /// An action condition or variable interpolation expression failed.
    Expression { action_id: String, reason: String },
    /// The action names an executor kind with no registered implementation.
    UnregisteredExecutor { kind: String },
    /// A node's executor returned a failure.
    ExecutorFailed { node_name: String, reason: String },
    /// The node driver could not be reached or used.
    NodeUnreachable { node_name: String, reason: String },
    /// The owning context was cancelled mid-action.
    Cancelled,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression { action_id, reason } => {
                write!(f, "expression error in action {action_id}: {reason}")
            }
            Self::UnregisteredExecutor { kind } => {
                write!(f, "no executor registered for kind {kind}")
            }
            Self::ExecutorFailed { node_name, reason } => {
                write!(f, "executor failed on node {node_name}: {reason}")
            }
            Self::NodeUnreachable { node_name, reason } => {
                write!(f, "node {node_name} unreachable: {reason}")
            }
            Self::Cancelled => write!(f, "execution cancelled"),
        }
    }
}

impl std::error::Error for ActionError {}

/// The outcome of attempting to run one worker-loop iteration past the
/// approval gate for an action.
#[derive(Debug)]
pub enum ApprovalGateError {
    /// The action is rejected; the execution is already cancelled.
    Rejected,
    /// A resume job was requested; the current job is done.
    PendingApproval,
}

/// Errors surfaced by the worker loop. Each terminates one execution, never
/// the worker itself.
#[derive(Debug)]
pub enum SchedulerError {
    /// The queue has no unlocked rows right now.
    NoJobs,
    /// A store entity referenced by this execution could not be found.
    NotFound { reason: String },
    /// The execution was suspended pending an external approval decision.
    PendingApproval { exec_id: ExecId, action_id: String },
    /// The execution's owning action was rejected.
    Rejected { exec_id: ExecId },
    /// Cooperative cancellation unwound the execution.
    ExecutionCancelled { exec_id: ExecId },
    /// An action failed; the execution is terminated as `errored`.
    ActionFailed { exec_id: ExecId, reason: String },
    /// A programmer/internal invariant was violated.
    Internal { reason: String },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJobs => write!(f, "no jobs available"),
            Self::NotFound { reason } => write!(f, "not found: {reason}"),
            Self::PendingApproval { exec_id, action_id } => {
                write!(f, "execution {exec_id} pending approval at {action_id}")
            }
            Self::Rejected { exec_id } => write!(f, "execution {exec_id} rejected"),
            Self::ExecutionCancelled { exec_id } => write!(f, "execution {exec_id} cancelled"),
            Self::ActionFailed { exec_id, reason } => {
                write!(f, "execution {exec_id} action failed: {reason}")
            }
            Self::Internal { reason } => write!(f, "internal scheduler error: {reason}"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<ActionError> for String {
    fn from(e: ActionError) -> Self {
        e.to_string()
    }
}
