//! The flow definition data model.
//!
//! Mirrors the YAML shape in the external interface: `metadata`, `inputs`,
//! and an ordered `actions` list. Actions are never a graph -- they run in
//! strict declaration order, with each action optionally fanning out across
//! multiple target [`Node`]s.

use flowforge_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete, validated flow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Unique, stable slug for this flow.
    pub slug: String,
    /// Human-readable name.
    pub name: String,
    /// Optional longer-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Hex-encoded SHA-256 digest of the raw source bytes this flow was
    /// loaded from. Populated by the loader, not hand-authored in YAML.
    #[serde(default)]
    pub checksum: String,
    /// Five-field cron expression, if this flow is triggered on a schedule.
    #[serde(default)]
    pub cron_schedule: Option<String>,
    /// Declared inputs, in declaration order.
    #[serde(default)]
    pub inputs: Vec<Input>,
    /// Ordered actions. Actions execute strictly in this order.
    pub actions: Vec<Action>,
}

impl Flow {
    /// Returns the zero-based index of the action with the given id, if any.
    #[must_use]
    pub fn action_index(&self, action_id: &str) -> Option<usize> {
        self.actions.iter().position(|a| a.id == action_id)
    }
}

/// A single declared flow input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Input {
    /// Input name, referenced as `inputs.<name>` in expressions.
    pub name: String,
    /// The input's declared type.
    #[serde(rename = "type", default)]
    pub input_type: InputType,
    /// Display label for presentation surfaces.
    #[serde(default)]
    pub label: Option<String>,
    /// Description for presentation surfaces.
    #[serde(default)]
    pub description: Option<String>,
    /// A JEXL expression that must evaluate to `true` for the supplied
    /// value, evaluated in an environment containing the named input.
    #[serde(default)]
    pub validation: Option<String>,
    /// Whether this input must be supplied (directly, or via `default`).
    #[serde(default)]
    pub required: bool,
    /// Default value used when the caller omits this input.
    #[serde(default)]
    pub default: Option<Value>,
}

/// The declared type of a flow input. Informational; the expression
/// evaluator works against [`Value`] regardless of this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// A UTF-8 string.
    #[default]
    String,
    /// A signed integer.
    Int,
    /// A floating point number.
    Float,
    /// A boolean.
    Bool,
    /// An ordered list.
    List,
    /// A string-keyed map.
    Map,
}

/// One step of a flow. May fan out across multiple [`Node`]s and may be
/// gated behind human approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier within the owning flow.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Executor registry key (e.g. `"script"`, `"docker"`).
    pub executor: String,
    /// Executor-specific image reference, if applicable.
    #[serde(default)]
    pub image: Option<String>,
    /// Arbitrary executor-specific configuration, marshalled to bytes as
    /// the `with_config` passed to the executor.
    #[serde(default)]
    pub with: BTreeMap<String, Value>,
    /// Named variables, each of whose value may contain `{{ expr }}` spans.
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Script lines run through the node driver's command execution, when
    /// `executor == "script"`.
    #[serde(default)]
    pub script: Vec<String>,
    /// Optional container entrypoint override, when the executor supports it.
    #[serde(default)]
    pub entrypoint: Vec<String>,
    /// Relative paths, within the remote working directory, to download
    /// back into the scratch artifact directory after a successful run.
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Optional JEXL expression gating whether this action runs at all.
    #[serde(default)]
    pub condition: Option<String>,
    /// Whether this action is a human-approval checkpoint.
    #[serde(default)]
    pub approval: bool,
    /// Target nodes. Empty means a single implicit local node.
    #[serde(default)]
    pub on: Vec<Node>,
}

/// A named variable whose value may contain `{{ expr }}` interpolation spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    /// Raw value, possibly containing `{{ expr }}` spans.
    pub value: String,
}

/// A target node an action can run on. An empty `name` denotes local
/// execution on the worker itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    /// Node name; empty denotes the implicit local node.
    #[serde(default)]
    pub name: String,
    /// Remote hostname, unused for the local node.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Remote port, unused for the local node.
    #[serde(default)]
    pub port: Option<u16>,
    /// Remote username, unused for the local node.
    #[serde(default)]
    pub username: Option<String>,
    /// Transport used to reach this node (e.g. `"ssh"`, `"local"`).
    #[serde(default)]
    pub connection_type: Option<String>,
    /// Operating system family, used for path-joining semantics.
    #[serde(default)]
    pub os_family: Option<OsFamily>,
    /// Authentication material for remote transports.
    #[serde(default)]
    pub auth: Option<NodeAuth>,
}

impl Node {
    /// Returns whether this is the implicit local node.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.name.is_empty()
    }
}

/// Operating system family of a node, used for path-joining semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    /// POSIX-style paths (`/`).
    #[default]
    Unix,
    /// Windows-style paths (`\`).
    Windows,
}

/// Authentication material for a remote node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAuth {
    /// Authentication method (e.g. `"key"`, `"password"`).
    pub method: String,
    /// Opaque key material or credential reference; resolution is left to
    /// the node driver implementation.
    #[serde(default)]
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_is_local_when_name_empty() {
        let node = Node::default();
        assert!(node.is_local());

        let remote = Node {
            name: "web1".to_string(),
            ..Default::default()
        };
        assert!(!remote.is_local());
    }

    #[test]
    fn flow_action_index_finds_by_id() {
        let flow = Flow {
            slug: "f".to_string(),
            name: "F".to_string(),
            description: None,
            checksum: String::new(),
            cron_schedule: None,
            inputs: vec![],
            actions: vec![
                Action {
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
                },
                Action {
                    id: "b".to_string(),
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
                },
            ],
        };

        assert_eq!(flow.action_index("b"), Some(1));
        assert_eq!(flow.action_index("missing"), None);
    }
}
