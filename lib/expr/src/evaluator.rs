//! Compile/run contract over a JEXL expression engine.

use crate::environment::Environment;
use crate::error::ExprError;
use flowforge_core::Value;
use jexl_eval::Evaluator;

/// A compiled expression program, ready to run against any [`Environment`].
///
/// JEXL compiles and evaluates in the same call, so "compiling" here amounts
/// to holding the validated source; the real parse/evaluate work happens in
/// [`ExpressionEvaluator::run`].
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
}

impl Program {
    /// Returns the original expression source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Compiles and runs JEXL expressions against a named `{inputs, secrets,
/// outputs}` environment.
///
/// Used in three places per the flow engine's design: input validation
/// expressions, `{{ … }}` variable interpolation, and action `condition`
/// gates.
pub trait ExpressionEvaluator: Send + Sync {
    /// Compiles an expression, failing fast on syntax errors.
    fn compile(&self, source: &str) -> Result<Program, ExprError>;

    /// Runs a compiled expression against the given environment.
    fn run(&self, program: &Program, env: &Environment) -> Result<Value, ExprError>;

    /// Convenience wrapper combining [`compile`](Self::compile) and
    /// [`run`](Self::run) for one-shot evaluation.
    fn eval(&self, source: &str, env: &Environment) -> Result<Value, ExprError> {
        let program = self.compile(source)?;
        self.run(&program, env)
    }
}

/// The production [`ExpressionEvaluator`], backed by `jexl-eval`.
#[derive(Default)]
pub struct JexlEvaluator {
    inner: Evaluator<'static>,
}

impl std::fmt::Debug for JexlEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JexlEvaluator").finish()
    }
}

impl JexlEvaluator {
    /// Creates a new evaluator instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Evaluator::new(),
        }
    }
}

impl ExpressionEvaluator for JexlEvaluator {
    fn compile(&self, source: &str) -> Result<Program, ExprError> {
        if source.trim().is_empty() {
            return Err(ExprError::CompileFailed {
                source: source.to_string(),
                reason: "expression is empty".to_string(),
            });
        }
        Ok(Program {
            source: source.to_string(),
        })
    }

    fn run(&self, program: &Program, env: &Environment) -> Result<Value, ExprError> {
        let context = env.to_json();
        self.inner
            .eval_in_context(&program.source, &context)
            .map(Value::from)
            .map_err(|e| ExprError::EvalFailed {
                source: program.source.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env_with(input: &str, value: Value) -> Environment {
        let mut inputs = BTreeMap::new();
        inputs.insert(input.to_string(), value);
        Environment::with_inputs(inputs)
    }

    #[test]
    fn evaluates_member_access() {
        let evaluator = JexlEvaluator::new();
        let env = env_with("x", Value::Int(5));

        let result = evaluator.eval("inputs.x > 3", &env).expect("eval");
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn evaluates_arithmetic_over_inputs_and_outputs() {
        let evaluator = JexlEvaluator::new();
        let mut env = env_with("x", Value::Int(1));
        env.outputs
            .insert("count".to_string(), Value::Int(10));

        let result = evaluator
            .eval("inputs.x + outputs.count", &env)
            .expect("eval");
        assert_eq!(result, Value::Int(11));
    }

    #[test]
    fn compile_rejects_empty_expression() {
        let evaluator = JexlEvaluator::new();
        assert!(evaluator.compile("").is_err());
    }

    #[test]
    fn run_surfaces_eval_errors() {
        let evaluator = JexlEvaluator::new();
        let env = Environment::default();
        let result = evaluator.eval("inputs.missing.deeper", &env);
        assert!(result.is_err());
    }
}
