//! The persisted store interface: flows, executions, and approvals.

pub mod error;
pub mod memory;
pub mod model;
pub mod store;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use model::{ApprovalRequest, ApprovalStatus, Execution, ExecutionStatus};
pub use store::Store;
