//! The `{inputs, secrets, outputs}` environment expressions evaluate against.

use flowforge_core::Value;
use std::collections::BTreeMap;

/// The named environment exposed to input validation expressions, action
/// conditions, and `{{ … }}` variable interpolation.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// User-supplied or defaulted flow inputs.
    pub inputs: BTreeMap<String, Value>,
    /// Namespace secrets loaded for the executing flow.
    pub secrets: BTreeMap<String, Value>,
    /// Outputs accumulated from prior actions, keyed per 4.I.2's result
    /// discipline (either `outputs[key]` or `outputs[node][key]`).
    pub outputs: BTreeMap<String, Value>,
}

impl Environment {
    /// Builds an environment with no secrets or outputs yet recorded, the
    /// shape a worker starts an execution with.
    #[must_use]
    pub fn with_inputs(inputs: BTreeMap<String, Value>) -> Self {
        Self {
            inputs,
            secrets: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Serializes the environment into the JSON context JEXL evaluates against.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "inputs": map_to_json(&self.inputs),
            "secrets": map_to_json(&self.secrets),
            "outputs": map_to_json(&self.outputs),
        })
    }
}

fn map_to_json(map: &BTreeMap<String, Value>) -> serde_json::Value {
    serde_json::Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), v.clone().into()))
            .collect(),
    )
}
