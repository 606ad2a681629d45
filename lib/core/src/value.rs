//! A dynamically-typed value used throughout the flow/expression/output surfaces.
//!
//! Flow YAML admits heterogeneous scalars in inputs, variables, and outputs;
//! the expression evaluator's environment is built from the same shape. A
//! single tagged `Value` threads that heterogeneity through the crate
//! boundary instead of each component inventing its own ad hoc JSON usage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A dynamically-typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A string-keyed map of values. `BTreeMap` keeps serialized output
    /// deterministic, which matters for checksum-adjacent comparisons.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns true if this value is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as a `&str`, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the value as a nested map, if it is one.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Coerces this value to the string representation used when an
    /// expression result is written back as an executor output variable
    /// (the executor contract returns `map<string, string>`).
    #[must_use]
    pub fn to_output_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Builds a `Value::Map` from a plain `String -> String` map, the shape
    /// an [`Executor`](crate) returns and the shape node results arrive in
    /// before they are folded into the `outputs` environment.
    #[must_use]
    pub fn map_from_strings(pairs: impl IntoIterator<Item = (String, String)>) -> Value {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_output_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Value::from(f),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(l) => serde_json::Value::Array(l.into_iter().map(Into::into).collect()),
            Value::Map(m) => {
                serde_json::Value::Object(m.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_output_string_coerces_scalars() {
        assert_eq!(Value::Int(42).to_output_string(), "42");
        assert_eq!(Value::Bool(true).to_output_string(), "true");
        assert_eq!(Value::Null.to_output_string(), "");
        assert_eq!(Value::String("hi".into()).to_output_string(), "hi");
    }

    #[test]
    fn json_roundtrip() {
        let json = serde_json::json!({"a": 1, "b": [true, null, "x"]});
        let value: Value = json.clone().into();
        let back: serde_json::Value = value.into();
        assert_eq!(json, back);
    }

    #[test]
    fn map_from_strings_builds_nested_map() {
        let value =
            Value::map_from_strings([("port".to_string(), "80".to_string())]);
        let map = value.as_map().expect("map");
        assert_eq!(map.get("port").unwrap().as_str(), Some("80"));
    }
}
