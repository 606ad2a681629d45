//! The durable job queue: a row-locked FIFO of pending flow executions.

mod error;
mod memory;
mod model;
mod postgres;
mod queue;

pub use error::QueueError;
pub use memory::InMemoryQueue;
pub use model::{FlowExecutionPayload, Job, TriggerType};
pub use postgres::PostgresQueue;
pub use queue::DurableQueue;
