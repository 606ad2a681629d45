//! The durable queue's row and payload types.

use chrono::{DateTime, Utc};
use flowforge_core::{ExecId, JobId, NamespaceId, UserId};
use flowforge_flow::Flow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use flowforge_core::Value;

/// How an execution's job was enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Enqueued in response to an external RPC call.
    Manual,
    /// Enqueued by the cron trigger's minute tick.
    Scheduled,
}

/// The opaque payload carried by a queue row.
///
/// Serialised to bytes for storage; `starting_action_idx` is what makes a
/// resume-after-approval job indistinguishable, to a worker, from a fresh
/// run -- it just starts partway through the action list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowExecutionPayload {
    /// The full flow definition to execute. Embedding the whole flow (not
    /// just its id) means a worker never needs a round trip to the store to
    /// begin running it.
    pub workflow: Flow,
    /// Resolved/defaulted input values for this execution.
    pub input: BTreeMap<String, Value>,
    /// The action index to begin (or resume) execution at.
    pub starting_action_idx: usize,
    /// The execution this job drives.
    pub exec_id: ExecId,
    /// Owning namespace.
    pub namespace_id: NamespaceId,
    /// How this job was triggered.
    pub trigger_type: TriggerType,
    /// The user (or system principal) this run is attributed to.
    pub user_id: UserId,
}

/// A durable queue row.
#[derive(Debug, Clone)]
pub struct Job {
    /// Row id (the `job_queue.id` serial primary key).
    pub id: JobId,
    /// The execution this job drives; denormalized onto the row for
    /// `CancelByExecID` without deserializing every payload.
    pub exec_id: ExecId,
    /// The opaque, serialized [`FlowExecutionPayload`].
    pub payload: FlowExecutionPayload,
    /// When this row was inserted.
    pub created_at: DateTime<Utc>,
}
