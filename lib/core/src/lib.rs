//! Core domain types and utilities for the flowforge workflow execution engine.
//!
//! This crate provides the foundational id types and shared value
//! representation used throughout the flow ingestion, queue, and scheduler
//! crates, plus the `Result` alias every layer's own error enum (`FlowError`,
//! `ExprError`, `StoreError`, `QueueError`, `SchedulerError`, ...) returns
//! through once wrapped in a `rootcause::Report` and given layer-appropriate
//! context via `.context(...)`.

pub mod id;
pub mod value;

pub use id::{ApprovalId, ExecId, FlowId, JobId, NamespaceId, ParseIdError, UserId};
pub use value::Value;

/// A `Result` alias over `rootcause::Report`, the layered-error carrier
/// every crate's domain error enum propagates through.
pub type Result<T, C = ()> = std::result::Result<T, rootcause::Report<C>>;
