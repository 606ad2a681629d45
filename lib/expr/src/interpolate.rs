//! `{{ expr }}` interpolation over action variable templates.

use crate::environment::Environment;
use crate::error::ExprError;
use crate::evaluator::ExpressionEvaluator;

/// Replaces every `{{ expr }}` span in `template` with the string form of
/// evaluating `expr` against `env`. Text outside `{{ … }}` spans, and a
/// template with no spans at all, passes through unchanged.
pub fn interpolate(
    evaluator: &dyn ExpressionEvaluator,
    template: &str,
    env: &Environment,
) -> Result<String, ExprError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            // Unterminated span: treat the rest of the template as literal text.
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let expr_src = after_open[..end].trim();
        let value = evaluator.eval(expr_src, env)?;
        out.push_str(&value.to_output_string());
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::JexlEvaluator;
    use flowforge_core::Value;
    use std::collections::BTreeMap;

    #[test]
    fn passes_through_non_templated_text() {
        let evaluator = JexlEvaluator::new();
        let env = Environment::default();
        let result = interpolate(&evaluator, "plain text", &env).unwrap();
        assert_eq!(result, "plain text");
    }

    #[test]
    fn substitutes_single_span() {
        let evaluator = JexlEvaluator::new();
        let mut inputs = BTreeMap::new();
        inputs.insert("x".to_string(), Value::Int(1));
        let env = Environment::with_inputs(inputs);

        let result = interpolate(&evaluator, "value is {{ inputs.x + 1 }}", &env).unwrap();
        assert_eq!(result, "value is 2");
    }

    #[test]
    fn substitutes_multiple_spans() {
        let evaluator = JexlEvaluator::new();
        let mut inputs = BTreeMap::new();
        inputs.insert("host".to_string(), Value::String("db1".to_string()));
        inputs.insert("port".to_string(), Value::Int(5432));
        let env = Environment::with_inputs(inputs);

        let result = interpolate(
            &evaluator,
            "{{ inputs.host }}:{{ inputs.port }}",
            &env,
        )
        .unwrap();
        assert_eq!(result, "db1:5432");
    }
}
