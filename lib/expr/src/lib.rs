//! Expression evaluation for the flowforge workflow execution engine.
//!
//! Flow definitions admit JEXL expressions in three places: input
//! `validation`, action `condition` gates, and `{{ … }}` variable
//! interpolation. This crate provides one evaluator contract used for all
//! three.

pub mod environment;
pub mod error;
pub mod evaluator;
pub mod interpolate;

pub use environment::Environment;
pub use error::ExprError;
pub use evaluator::{ExpressionEvaluator, JexlEvaluator, Program};
pub use interpolate::interpolate;
