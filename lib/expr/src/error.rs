//! Errors from expression compilation and evaluation.

use std::fmt;

/// Errors surfaced by the expression evaluator.
///
/// Error text is passed through verbatim from the underlying JEXL engine, per
/// the "errors are surfaced verbatim" requirement on the evaluator contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// The expression source failed to compile.
    CompileFailed { source: String, reason: String },
    /// The compiled expression failed to evaluate against the given
    /// environment.
    EvalFailed { source: String, reason: String },
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompileFailed { source, reason } => {
                write!(f, "failed to compile expression '{source}': {reason}")
            }
            Self::EvalFailed { source, reason } => {
                write!(f, "failed to evaluate expression '{source}': {reason}")
            }
        }
    }
}

impl std::error::Error for ExprError {}
