//! Pluggable action executors, keyed by registry kind.
//!
//! A `docker` executor is sketched only as an interface consumer (container
//! runtime access is out of scope); `script` is the one concrete executor
//! this crate ships, running `action.script` lines through the node
//! driver's `run_command`.

use crate::error::ActionError;
use crate::node_driver::NodeDriver;
use flowforge_core::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Per-node-scoped writers for an action's live output, prefixing records
/// with the originating node name before they reach the shared log stream.
pub trait NodeLogger: Send + Sync {
    /// Writes one line of captured stdout.
    fn write_stdout(&self, line: &str);
    /// Writes one line of captured stderr.
    fn write_stderr(&self, line: &str);
}

/// A no-op logger, used by tests that don't care about log output.
pub struct NullLogger;

impl NodeLogger for NullLogger {
    fn write_stdout(&self, _line: &str) {}
    fn write_stderr(&self, _line: &str) {}
}

/// Everything one executor invocation needs: resolved input variables, the
/// action's raw `with` config, any artifact paths it cares about, and
/// per-node log writers.
pub struct ExecutionContext<'a> {
    /// Interpolated variable values, keyed by variable name.
    pub inputs: BTreeMap<String, Value>,
    /// The action's `with` mapping, marshalled to YAML bytes.
    pub with_config: Vec<u8>,
    /// Script lines to run, when this is a `script` action.
    pub script: Vec<String>,
    /// Relative artifact paths the caller expects downloaded afterward.
    pub artifacts: Vec<String>,
    /// Sink for this node's live stdout/stderr.
    pub logger: &'a dyn NodeLogger,
}

/// A registered action executor, bound to one node driver instance.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Runs the action against this executor's bound node, returning its
    /// output variables.
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<HashMap<String, String>, String>;
}

/// Runs `script` lines through the bound node driver's `run_command`.
pub struct ScriptExecutor {
    driver: Arc<dyn NodeDriver>,
}

impl ScriptExecutor {
    /// Binds a script executor to a node driver.
    #[must_use]
    pub fn new(driver: Arc<dyn NodeDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait::async_trait]
impl Executor for ScriptExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<HashMap<String, String>, String> {
        let mut combined_stdout = String::new();
        for line in &ctx.script {
            let out = self.driver.run_command(line).await.map_err(|e| {
                ctx.logger.write_stderr(&e);
                e
            })?;
            ctx.logger.write_stdout(&out);
            if !combined_stdout.is_empty() {
                combined_stdout.push('\n');
            }
            combined_stdout.push_str(out.trim_end());
        }

        let mut result = HashMap::new();
        result.insert("stdout".to_string(), combined_stdout);
        Ok(result)
    }
}

type ExecutorFactory =
    dyn Fn(&str, Arc<dyn NodeDriver>) -> Box<dyn Executor> + Send + Sync;

/// A process-startup registry of executor factories, keyed by `executor`
/// kind. Registration is meant to happen once at startup; a second
/// registration of the same kind is a programmer error and panics.
#[derive(Default)]
pub struct ExecutorRegistry {
    factories: HashMap<String, Box<ExecutorFactory>>,
}

impl ExecutorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `kind`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is already registered.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&str, Arc<dyn NodeDriver>) -> Box<dyn Executor> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.factories.contains_key(&kind) {
            panic!("executor kind already registered: {kind}");
        }
        self.factories.insert(kind, Box::new(factory));
    }

    /// Returns the set of registered executor kinds, for flow validation.
    #[must_use]
    pub fn known_kinds(&self) -> std::collections::HashSet<String> {
        self.factories.keys().cloned().collect()
    }

    /// Builds an executor instance for `kind`, bound to `driver`, with the
    /// per-node executor id `"{action_id}-{node_name}"` (or bare
    /// `action_id` for the implicit local node).
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnregisteredExecutor`] if `kind` has no
    /// registered factory.
    pub fn create(
        &self,
        kind: &str,
        id: &str,
        driver: Arc<dyn NodeDriver>,
    ) -> Result<Box<dyn Executor>, ActionError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ActionError::UnregisteredExecutor {
                kind: kind.to_string(),
            })?;
        Ok(factory(id, driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_driver::LocalNodeDriver;
    use flowforge_flow::OsFamily;
    use tempfile::tempdir;

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = ExecutorRegistry::new();
        registry.register("script", |_id, driver| {
            Box::new(ScriptExecutor::new(driver)) as Box<dyn Executor>
        });
        registry.register("script", |_id, driver| {
            Box::new(ScriptExecutor::new(driver)) as Box<dyn Executor>
        });
    }

    #[test]
    fn unregistered_kind_is_rejected() {
        let registry = ExecutorRegistry::new();
        let driver = Arc::new(LocalNodeDriver::new(
            std::env::temp_dir(),
            OsFamily::Unix,
        ));
        let result = registry.create("docker", "a-web1", driver);
        assert!(matches!(result, Err(ActionError::UnregisteredExecutor { .. })));
    }

    #[tokio::test]
    async fn script_executor_runs_lines_and_captures_stdout() {
        let scratch = tempdir().unwrap();
        let driver = Arc::new(LocalNodeDriver::new(scratch.path().to_path_buf(), OsFamily::Unix));
        let executor = ScriptExecutor::new(driver);

        let ctx = ExecutionContext {
            inputs: BTreeMap::new(),
            with_config: Vec::new(),
            script: vec!["echo one".to_string(), "echo two".to_string()],
            artifacts: Vec::new(),
            logger: &NullLogger,
        };

        let result = executor.execute(ctx).await.unwrap();
        assert_eq!(result.get("stdout").unwrap(), "one\ntwo");
    }
}
