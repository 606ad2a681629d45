//! Flow definition model, YAML loading, and validation.
//!
//! A flow is a declarative workflow definition: an ordered sequence of
//! [`Action`]s, each optionally fanning out across multiple target
//! [`Node`]s, gated by declared [`Input`]s.

pub mod error;
pub mod loader;
pub mod model;
pub mod validator;

pub use error::{FlowValidationError, LoadError};
pub use loader::{checksum, load_from_bytes, load_from_file};
pub use model::{Action, Flow, Input, InputType, Node, NodeAuth, OsFamily, Variable};
pub use validator::{validate, validate_cron, validate_input};
