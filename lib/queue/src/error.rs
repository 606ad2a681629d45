//! Errors from durable queue operations.

use flowforge_core::ExecId;
use std::fmt;

/// Errors raised by [`DurableQueue`](crate::DurableQueue) operations.
#[derive(Debug)]
pub enum QueueError {
    /// The queue currently has no unlocked rows. Not a failure -- a control
    /// signal a worker loop polls on.
    NoJobs,
    /// A queue row referenced by id or `exec_id` does not exist.
    NotFound { exec_id: Option<ExecId> },
    /// An unexpected backend failure (I/O, serialization, SQL).
    Internal { reason: String },
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJobs => write!(f, "no jobs available"),
            Self::NotFound { exec_id: Some(id) } => write!(f, "job not found for execution {id}"),
            Self::NotFound { exec_id: None } => write!(f, "job not found"),
            Self::Internal { reason } => write!(f, "queue error: {reason}"),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<sqlx::Error> for QueueError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => QueueError::NoJobs,
            other => QueueError::Internal {
                reason: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        QueueError::Internal {
            reason: e.to_string(),
        }
    }
}
