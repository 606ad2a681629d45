//! Cron trigger, executor pipeline, and worker pool for the flowforge
//! engine.
//!
//! This crate provides:
//!
//! - **Cron trigger** (`cron`): the minute-tick scan over scheduled flows.
//! - **Log stream** (`log_stream`): retained, broadcast-backed per-execution
//!   log streams.
//! - **Node driver** (`node_driver`): the per-target-node transport
//!   abstraction, plus a local-filesystem reference implementation.
//! - **Executor registry** (`executor`): pluggable action executors keyed by
//!   kind.
//! - **Secrets** (`secrets`): namespace secret resolution for a running flow.
//! - **Approval coordinator** (`approval`): request/decide/resume for
//!   human-approval checkpoints.
//! - **Worker** (`worker`): the worker-loop state machine tying everything
//!   above together.

pub mod approval;
pub mod cron;
pub mod error;
pub mod executor;
pub mod log_stream;
pub mod node_driver;
pub mod secrets;
pub mod worker;

pub use approval::ApprovalCoordinator;
pub use cron::{run_ticker, should_run_now, system_user_id, tick};
pub use error::{ActionError, ApprovalGateError, SchedulerError};
pub use executor::{
    Executor, ExecutionContext, ExecutorRegistry, NodeLogger, NullLogger, ScriptExecutor,
};
pub use log_stream::{stream_logs, LogSink, MessageKind, StreamMessage};
pub use node_driver::{LocalNodeDriver, LocalOnlyNodeDriverFactory, NodeDriver, NodeDriverFactory};
pub use secrets::{NoopSecretsProvider, SecretsProvider};
pub use worker::Worker;
