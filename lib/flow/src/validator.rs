//! Structural flow validation and input validation.

use crate::error::FlowValidationError;
use crate::model::Flow;
use croner::Cron;
use flowforge_expr::{Environment, ExpressionEvaluator};
use flowforge_core::Value;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

/// Validates a flow's static structure: non-empty slug, unique action ids,
/// a parseable cron expression (if any), and that every action's executor
/// is registered.
///
/// `known_executors` is supplied by the caller (normally the executor
/// registry) rather than looked up here, so this crate never depends on the
/// scheduler crate that owns the registry.
///
/// # Errors
///
/// Returns the first structural problem found.
pub fn validate(flow: &Flow, known_executors: &HashSet<String>) -> Result<(), FlowValidationError> {
    if flow.slug.trim().is_empty() {
        return Err(FlowValidationError::new("flow", "slug must not be empty"));
    }

    let mut seen_ids = HashSet::new();
    for action in &flow.actions {
        if !seen_ids.insert(action.id.as_str()) {
            return Err(FlowValidationError::new(
                "actions",
                format!("duplicate action id '{}'", action.id),
            ));
        }
        if !known_executors.contains(&action.executor) {
            return Err(FlowValidationError::new(
                format!("actions.{}", action.id),
                format!("executor '{}' is not registered", action.executor),
            ));
        }
    }

    if let Some(cron) = &flow.cron_schedule {
        validate_cron(cron)
            .map_err(|reason| FlowValidationError::new("cron_schedule", reason))?;
    }

    Ok(())
}

/// Validates that a cron expression parses as a standard five-field
/// expression.
///
/// # Errors
///
/// Returns a human-readable reason the expression is invalid.
pub fn validate_cron(expression: &str) -> Result<(), String> {
    Cron::from_str(expression)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Validates and defaults a caller-supplied input map against a flow's
/// declared [`Input`](crate::model::Input)s.
///
/// Unknown fields in `supplied` are ignored. A missing required input with
/// no default fails. A missing optional input takes its declared default
/// (or [`Value::Null`] if none). Every present value is checked against its
/// `validation` expression, if declared.
///
/// # Errors
///
/// Returns the first validation failure encountered, in declaration order.
pub fn validate_input(
    flow: &Flow,
    supplied: &BTreeMap<String, Value>,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<BTreeMap<String, Value>, FlowValidationError> {
    let mut resolved = BTreeMap::new();

    for input in &flow.inputs {
        let value = match supplied.get(&input.name) {
            Some(v) => v.clone(),
            None => match &input.default {
                Some(default) => default.clone(),
                None => {
                    if input.required {
                        return Err(FlowValidationError::new(
                            &input.name,
                            "required input is missing and has no default",
                        ));
                    }
                    Value::Null
                }
            },
        };

        if let Some(expr) = &input.validation {
            let mut env = Environment::with_inputs(resolved.clone());
            env.inputs.insert(input.name.clone(), value.clone());
            let outcome = evaluator
                .eval(expr, &env)
                .map_err(|e| FlowValidationError::new(&input.name, e.to_string()))?;
            if outcome != Value::Bool(true) {
                return Err(FlowValidationError::new(
                    &input.name,
                    format!("validation expression '{expr}' did not pass"),
                ));
            }
        }

        resolved.insert(input.name.clone(), value);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, Input, InputType};
    use flowforge_expr::JexlEvaluator;

    fn sample_flow() -> Flow {
        Flow {
            slug: "f".to_string(),
            name: "F".to_string(),
            description: None,
            checksum: String::new(),
            cron_schedule: None,
            inputs: vec![],
            actions: vec![Action {
                id: "a".to_string(),
                name: None,
                executor: "script".to_string(),
                image: None,
                with: BTreeMap::new(),
                variables: vec![],
                script: vec![],
                entrypoint: vec![],
                artifacts: vec![],
                condition: None,
                approval: false,
                on: vec![],
            }],
        }
    }

    #[test]
    fn rejects_empty_slug() {
        let mut flow = sample_flow();
        flow.slug = String::new();
        let known = HashSet::from(["script".to_string()]);
        assert!(validate(&flow, &known).is_err());
    }

    #[test]
    fn rejects_duplicate_action_ids() {
        let mut flow = sample_flow();
        let dup = flow.actions[0].clone();
        flow.actions.push(dup);
        let known = HashSet::from(["script".to_string()]);
        assert!(validate(&flow, &known).is_err());
    }

    #[test]
    fn rejects_unregistered_executor() {
        let flow = sample_flow();
        let known = HashSet::from(["docker".to_string()]);
        assert!(validate(&flow, &known).is_err());
    }

    #[test]
    fn rejects_invalid_cron() {
        let mut flow = sample_flow();
        flow.cron_schedule = Some("not a cron".to_string());
        let known = HashSet::from(["script".to_string()]);
        assert!(validate(&flow, &known).is_err());
    }

    #[test]
    fn accepts_well_formed_flow() {
        let mut flow = sample_flow();
        flow.cron_schedule = Some("0 7 * * *".to_string());
        let known = HashSet::from(["script".to_string()]);
        assert!(validate(&flow, &known).is_ok());
    }

    #[test]
    fn validate_input_defaults_missing_optional() {
        let mut flow = sample_flow();
        flow.inputs.push(Input {
            name: "retries".to_string(),
            input_type: InputType::Int,
            label: None,
            description: None,
            validation: None,
            required: false,
            default: Some(Value::Int(3)),
        });

        let evaluator = JexlEvaluator::new();
        let resolved = validate_input(&flow, &BTreeMap::new(), &evaluator).unwrap();
        assert_eq!(resolved.get("retries"), Some(&Value::Int(3)));
    }

    #[test]
    fn validate_input_fails_missing_required() {
        let mut flow = sample_flow();
        flow.inputs.push(Input {
            name: "version".to_string(),
            input_type: InputType::String,
            label: None,
            description: None,
            validation: None,
            required: true,
            default: None,
        });

        let evaluator = JexlEvaluator::new();
        let result = validate_input(&flow, &BTreeMap::new(), &evaluator);
        assert!(result.is_err());
    }

    #[test]
    fn validate_input_runs_validation_expression() {
        let mut flow = sample_flow();
        flow.inputs.push(Input {
            name: "count".to_string(),
            input_type: InputType::Int,
            label: None,
            description: None,
            validation: Some("inputs.count > 0".to_string()),
            required: true,
            default: None,
        });

        let evaluator = JexlEvaluator::new();
        let mut supplied = BTreeMap::new();
        supplied.insert("count".to_string(), Value::Int(-1));

        let result = validate_input(&flow, &supplied, &evaluator);
        assert!(result.is_err());
    }
}
