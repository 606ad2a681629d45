//! Errors from the store interface.

use flowforge_core::{ApprovalId, ExecId, FlowId};
use std::fmt;

/// Errors raised by [`Store`](crate::Store) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A flow record was not found.
    FlowNotFound { id: FlowId },
    /// An execution record was not found.
    ExecutionNotFound { exec_id: ExecId },
    /// An approval record was not found.
    ApprovalNotFound { id: ApprovalId },
    /// An operation conflicted with existing state (e.g. a second open
    /// approval for the same execution/action pair).
    Conflict { reason: String },
    /// An unexpected backend failure.
    Internal { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlowNotFound { id } => write!(f, "flow not found: {id}"),
            Self::ExecutionNotFound { exec_id } => write!(f, "execution not found: {exec_id}"),
            Self::ApprovalNotFound { id } => write!(f, "approval not found: {id}"),
            Self::Conflict { reason } => write!(f, "conflict: {reason}"),
            Self::Internal { reason } => write!(f, "store error: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}
