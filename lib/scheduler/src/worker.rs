//! The worker loop: leases one job at a time, drives its flow's actions in
//! order, and transitions the owning execution to a terminal status.
//!
//! Grounded on the originating system's `executeFlow`/`executeSingleAction`/
//! `executeOnNode`/`processActionResults` handlers, reshaped around Rust's
//! `async_trait` collaborators instead of a monolithic scheduler struct.

use crate::error::{ActionError, ApprovalGateError, SchedulerError};
use crate::executor::{ExecutionContext, ExecutorRegistry, NodeLogger};
use crate::log_stream::{LogSink, MessageKind, StreamMessage};
use crate::node_driver::NodeDriverFactory;
use crate::secrets::SecretsProvider;
use crate::ApprovalCoordinator;
use flowforge_core::{ExecId, Value};
use flowforge_expr::{Environment, ExpressionEvaluator};
use flowforge_flow::{Action, Node};
use flowforge_queue::{DurableQueue, Job, QueueError};
use flowforge_store::{ApprovalStatus, ExecutionStatus, Store};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

const ACTION_TIMEOUT: StdDuration = StdDuration::from_secs(60 * 60);

/// The outcome of attempting to advance one action within a flow.
enum ActionOutcome {
    Ran(HashMap<String, String>),
    PendingApproval,
    Rejected,
    Cancelled,
    Failed(String),
}

impl From<ApprovalGateError> for ActionOutcome {
    fn from(e: ApprovalGateError) -> Self {
        match e {
            ApprovalGateError::Rejected => ActionOutcome::Rejected,
            ApprovalGateError::PendingApproval => ActionOutcome::PendingApproval,
        }
    }
}

/// Forwards captured node output to the shared [`LogSink`], tagging every
/// record with the owning action and node.
struct SinkNodeLogger {
    sink: Arc<LogSink>,
    exec_id: ExecId,
    action_id: String,
    node_name: String,
}

impl NodeLogger for SinkNodeLogger {
    fn write_stdout(&self, line: &str) {
        self.sink.checkpoint(
            self.exec_id,
            StreamMessage {
                action_id: Some(self.action_id.clone()),
                node_name: self.node_name.clone(),
                value: line.to_string(),
                kind: MessageKind::Stdout,
            },
        );
    }

    fn write_stderr(&self, line: &str) {
        self.sink.checkpoint(
            self.exec_id,
            StreamMessage {
                action_id: Some(self.action_id.clone()),
                node_name: self.node_name.clone(),
                value: line.to_string(),
                kind: MessageKind::Stderr,
            },
        );
    }
}

/// One worker's collaborators. Many workers may share the same `Arc`-wrapped
/// instance to run a pool of size `C`.
pub struct Worker {
    store: Arc<dyn Store>,
    queue: Arc<dyn DurableQueue>,
    log_sink: Arc<LogSink>,
    registry: Arc<ExecutorRegistry>,
    node_driver_factory: Arc<dyn NodeDriverFactory>,
    secrets: Arc<dyn SecretsProvider>,
    approvals: Arc<ApprovalCoordinator>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    action_timeout: StdDuration,
}

impl Worker {
    /// Assembles a worker from its collaborators, using the default
    /// per-action timeout.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<dyn DurableQueue>,
        log_sink: Arc<LogSink>,
        registry: Arc<ExecutorRegistry>,
        node_driver_factory: Arc<dyn NodeDriverFactory>,
        secrets: Arc<dyn SecretsProvider>,
        approvals: Arc<ApprovalCoordinator>,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Self {
        Self::with_action_timeout(
            store,
            queue,
            log_sink,
            registry,
            node_driver_factory,
            secrets,
            approvals,
            evaluator,
            ACTION_TIMEOUT,
        )
    }

    /// Assembles a worker from its collaborators with an explicit
    /// per-action timeout, overriding the default.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_action_timeout(
        store: Arc<dyn Store>,
        queue: Arc<dyn DurableQueue>,
        log_sink: Arc<LogSink>,
        registry: Arc<ExecutorRegistry>,
        node_driver_factory: Arc<dyn NodeDriverFactory>,
        secrets: Arc<dyn SecretsProvider>,
        approvals: Arc<ApprovalCoordinator>,
        evaluator: Arc<dyn ExpressionEvaluator>,
        action_timeout: StdDuration,
    ) -> Self {
        Self {
            store,
            queue,
            log_sink,
            registry,
            node_driver_factory,
            secrets,
            approvals,
            evaluator,
            action_timeout,
        }
    }

    /// Leases and runs one job to completion (or suspension). Returns
    /// [`SchedulerError::NoJobs`] when the queue is empty, the signal a
    /// caller polls on with backoff.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`SchedulerError`] for the execution this job
    /// drove, or [`SchedulerError::NoJobs`] if nothing was queued.
    pub async fn run_once(&self) -> Result<(), SchedulerError> {
        let job = match self.queue.get().await {
            Ok(job) => job,
            Err(QueueError::NoJobs) => return Err(SchedulerError::NoJobs),
            Err(e) => {
                return Err(SchedulerError::Internal {
                    reason: e.to_string(),
                })
            }
        };

        let result = self.execute_job(&job).await;

        if let Err(e) = self.queue.delete(job.id).await {
            tracing::warn!(job = job.id.0, error = %e, "failed to delete leased job");
        }

        result
    }

    async fn execute_job(&self, job: &Job) -> Result<(), SchedulerError> {
        let payload = &job.payload;
        let flow = &payload.workflow;
        let exec_id = payload.exec_id;
        let namespace_id = payload.namespace_id;
        let start_idx = payload.starting_action_idx.min(flow.actions.len());

        let artifact_dir =
            tempfile::Builder::new()
                .prefix(&format!("flowforge-artifacts-{exec_id}-"))
                .tempdir()
                .map_err(|e| SchedulerError::Internal {
                    reason: e.to_string(),
                })?;

        let secrets_map = match self.secrets.get_secrets(&flow.slug, namespace_id).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(exec_id = %exec_id, error = %e, "failed to load flow secrets, continuing with an empty set");
                HashMap::new()
            }
        };

        let mut env = Environment {
            inputs: payload.input.clone(),
            secrets: secrets_map
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
            outputs: BTreeMap::new(),
        };

        for idx in start_idx..flow.actions.len() {
            let action = &flow.actions[idx];

            if self.execution_is_cancelled(exec_id).await {
                tracing::debug!(exec_id = %exec_id, action = %action.id, "execution cancelled, unwinding worker loop");
                self.checkpoint_cancelled(exec_id, &action.id);
                return self.finish_cancelled(exec_id).await;
            }

            match self
                .execute_single_action(payload, action, artifact_dir.path(), &mut env)
                .await
            {
                ActionOutcome::Ran(result) => {
                    self.log_sink.checkpoint(
                        exec_id,
                        StreamMessage {
                            action_id: Some(action.id.clone()),
                            node_name: String::new(),
                            value: format!("{result:?}"),
                            kind: MessageKind::Result,
                        },
                    );
                    fold_results(result, &mut env.outputs);
                }
                ActionOutcome::PendingApproval => {
                    tracing::debug!(exec_id = %exec_id, action = %action.id, "suspending execution pending approval");
                    return Err(SchedulerError::PendingApproval {
                        exec_id,
                        action_id: action.id.clone(),
                    });
                }
                ActionOutcome::Rejected => {
                    tracing::debug!(exec_id = %exec_id, action = %action.id, "action rejected, execution cancelled");
                    return Err(SchedulerError::Rejected { exec_id });
                }
                ActionOutcome::Cancelled => {
                    self.checkpoint_cancelled(exec_id, &action.id);
                    return self.finish_cancelled(exec_id).await;
                }
                ActionOutcome::Failed(reason) => {
                    self.log_sink.checkpoint(
                        exec_id,
                        StreamMessage {
                            action_id: Some(action.id.clone()),
                            node_name: String::new(),
                            value: reason.clone(),
                            kind: MessageKind::Error,
                        },
                    );
                    self.finish(exec_id, ExecutionStatus::Errored, Some(reason.clone()))
                        .await;
                    return Err(SchedulerError::ActionFailed { exec_id, reason });
                }
            }
        }

        self.finish(exec_id, ExecutionStatus::Completed, None).await;
        Ok(())
    }

    async fn execution_is_cancelled(&self, exec_id: ExecId) -> bool {
        matches!(
            self.store.get_execution(exec_id).await,
            Ok(execution) if execution.status == ExecutionStatus::Cancelled
        )
    }

    fn checkpoint_cancelled(&self, exec_id: ExecId, action_id: &str) {
        self.log_sink.checkpoint(
            exec_id,
            StreamMessage {
                action_id: Some(action_id.to_string()),
                node_name: String::new(),
                value: String::new(),
                kind: MessageKind::Cancelled,
            },
        );
    }

    async fn finish_cancelled(&self, exec_id: ExecId) -> Result<(), SchedulerError> {
        self.finish(exec_id, ExecutionStatus::Cancelled, None).await;
        Err(SchedulerError::ExecutionCancelled { exec_id })
    }

    async fn finish(&self, exec_id: ExecId, status: ExecutionStatus, error: Option<String>) {
        tracing::info!(exec_id = %exec_id, status = ?status, "execution reached terminal status");
        if let Err(e) = self.store.finish_execution(exec_id, status, error).await {
            tracing::warn!(exec_id = %exec_id, error = %e, "failed to persist terminal execution status");
        }
        self.log_sink.close(exec_id);
    }

    async fn execute_single_action(
        &self,
        payload: &flowforge_queue::FlowExecutionPayload,
        action: &Action,
        artifact_dir: &Path,
        env: &mut Environment,
    ) -> ActionOutcome {
        let exec_id = payload.exec_id;
        if let Err(gate) = self.check_approval(payload, action).await {
            return gate.into();
        }

        if let Some(condition) = &action.condition {
            match self.evaluator.eval(condition, env) {
                Ok(Value::Bool(true)) => {}
                Ok(_) => return ActionOutcome::Ran(HashMap::new()),
                Err(e) => {
                    return ActionOutcome::Failed(
                        ActionError::Expression {
                            action_id: action.id.clone(),
                            reason: e.to_string(),
                        }
                        .to_string(),
                    )
                }
            }
        }

        match self
            .run_action(exec_id, action, artifact_dir, env)
            .await
        {
            Ok(result) => ActionOutcome::Ran(result),
            Err(ActionError::Cancelled) => ActionOutcome::Cancelled,
            Err(e) => ActionOutcome::Failed(e.to_string()),
        }
    }

    /// Updates `current_action_id` and gates on this action's approval
    /// checkpoint, if any.
    async fn check_approval(
        &self,
        payload: &flowforge_queue::FlowExecutionPayload,
        action: &Action,
    ) -> Result<(), ApprovalGateError> {
        let exec_id = payload.exec_id;
        let namespace_id = payload.namespace_id;
        if let Err(e) = self.store.set_current_action(exec_id, &action.id).await {
            tracing::warn!(exec_id = %exec_id, error = %e, "failed to record current action");
        }

        if !action.approval {
            return Ok(());
        }

        let open = self
            .store
            .find_open_approval(exec_id, &action.id)
            .await
            .unwrap_or(None);

        match open {
            Some(approval) if approval.status == ApprovalStatus::Approved => Ok(()),
            Some(approval) if approval.status == ApprovalStatus::Rejected => {
                Err(ApprovalGateError::Rejected)
            }
            Some(_) => Err(ApprovalGateError::PendingApproval),
            None => {
                if let Err(e) = self
                    .approvals
                    .request_approval(exec_id, namespace_id, &action.id, payload)
                    .await
                {
                    tracing::warn!(exec_id = %exec_id, action = %action.id, error = %e, "failed to request approval");
                }
                Err(ApprovalGateError::PendingApproval)
            }
        }
    }

    /// Runs one action across every target node, merging their results.
    async fn run_action(
        &self,
        exec_id: ExecId,
        action: &Action,
        artifact_dir: &Path,
        env: &Environment,
    ) -> Result<HashMap<String, String>, ActionError> {
        let input_vars = self.interpolate_variables(action, env)?;
        let with_config = serde_yaml::to_string(&action.with)
            .map(String::into_bytes)
            .map_err(|e| ActionError::Expression {
                action_id: action.id.clone(),
                reason: format!("failed to marshal action config: {e}"),
            })?;

        let nodes = if action.on.is_empty() {
            vec![Node::default()]
        } else {
            action.on.clone()
        };

        let mut join_set = tokio::task::JoinSet::new();
        for node in nodes {
            let action = action.clone();
            let input_vars = input_vars.clone();
            let with_config = with_config.clone();
            let artifact_dir = artifact_dir.to_path_buf();
            let registry = Arc::clone(&self.registry);
            let driver_factory = Arc::clone(&self.node_driver_factory);
            let log_sink = Arc::clone(&self.log_sink);

            join_set.spawn(tokio::time::timeout(self.action_timeout, async move {
                execute_on_node(
                    exec_id,
                    &action,
                    node,
                    input_vars,
                    with_config,
                    &artifact_dir,
                    registry.as_ref(),
                    driver_factory.as_ref(),
                    log_sink,
                )
                .await
            }));
        }

        let mut merged = HashMap::new();
        let mut first_error: Option<ActionError> = None;

        while let Some(joined) = join_set.join_next().await {
            let outcome = match joined {
                Ok(Ok(inner)) => inner,
                Ok(Err(_elapsed)) => Err(ActionError::ExecutorFailed {
                    node_name: String::new(),
                    reason: "action timed out after one hour".to_string(),
                }),
                Err(join_err) if join_err.is_cancelled() => Err(ActionError::Cancelled),
                Err(join_err) => Err(ActionError::ExecutorFailed {
                    node_name: String::new(),
                    reason: join_err.to_string(),
                }),
            };

            match outcome {
                Ok(result) => merged.extend(result),
                Err(ActionError::Cancelled) => {
                    join_set.abort_all();
                    return Err(ActionError::Cancelled);
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        Ok(merged)
    }

    fn interpolate_variables(
        &self,
        action: &Action,
        env: &Environment,
    ) -> Result<BTreeMap<String, Value>, ActionError> {
        let mut vars = BTreeMap::new();
        for variable in &action.variables {
            let rendered = flowforge_expr::interpolate(self.evaluator.as_ref(), &variable.value, env)
                .map_err(|e| ActionError::Expression {
                    action_id: action.id.clone(),
                    reason: e.to_string(),
                })?;
            vars.insert(variable.name.clone(), Value::String(rendered));
        }
        Ok(vars)
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute_on_node(
    exec_id: ExecId,
    action: &Action,
    node: Node,
    input_vars: BTreeMap<String, Value>,
    with_config: Vec<u8>,
    artifact_dir: &Path,
    registry: &ExecutorRegistry,
    driver_factory: &dyn NodeDriverFactory,
    log_sink: Arc<LogSink>,
) -> Result<HashMap<String, String>, ActionError> {
    let driver = driver_factory
        .build(&node, artifact_dir)
        .map_err(|reason| ActionError::NodeUnreachable {
            node_name: node.name.clone(),
            reason,
        })?;

    if !node.is_local() {
        driver
            .check_connectivity()
            .await
            .map_err(|reason| ActionError::NodeUnreachable {
                node_name: node.name.clone(),
                reason,
            })?;
    }

    let executor_id = if node.is_local() {
        action.id.clone()
    } else {
        format!("{}-{}", action.id, node.name)
    };

    let executor = registry.create(&action.executor, &executor_id, Arc::clone(&driver))?;

    push_artifacts(driver.as_ref(), artifact_dir)
        .await
        .map_err(|reason| ActionError::NodeUnreachable {
            node_name: node.name.clone(),
            reason,
        })?;

    let logger = SinkNodeLogger {
        sink: log_sink,
        exec_id,
        action_id: action.id.clone(),
        node_name: node.name.clone(),
    };

    let ctx = ExecutionContext {
        inputs: input_vars,
        with_config,
        script: action.script.clone(),
        artifacts: action.artifacts.clone(),
        logger: &logger,
    };

    let result = executor
        .execute(ctx)
        .await
        .map_err(|reason| ActionError::ExecutorFailed {
            node_name: node.name.clone(),
            reason,
        })?;

    if !action.artifacts.is_empty() {
        pull_artifacts(driver.as_ref(), artifact_dir, &action.artifacts, &node.name)
            .await
            .map_err(|reason| ActionError::NodeUnreachable {
                node_name: node.name.clone(),
                reason,
            })?;
    }

    driver.close().await;

    Ok(prefix_result_keys(result, &node.name))
}

async fn push_artifacts(
    driver: &dyn crate::node_driver::NodeDriver,
    artifact_dir: &Path,
) -> Result<(), String> {
    let mut pending = vec![artifact_dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| e.to_string())?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| e.to_string())? {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(artifact_dir).map_err(|e| e.to_string())?;
                let relative_str = relative.to_string_lossy();
                let remote = driver.join(&[driver.working_directory(), relative_str.as_ref()]);
                driver.upload(&path, &remote).await?;
            }
        }
    }
    Ok(())
}

async fn pull_artifacts(
    driver: &dyn crate::node_driver::NodeDriver,
    artifact_dir: &Path,
    artifacts: &[String],
    node_name: &str,
) -> Result<(), String> {
    for artifact in artifacts {
        let remote = driver.join(&[driver.working_directory(), artifact.as_str()]);
        let local = if node_name.is_empty() {
            artifact_dir.join(artifact)
        } else {
            artifact_dir.join(node_name).join(artifact)
        };
        driver.download(&remote, &local).await?;
    }
    Ok(())
}

/// Normalises a result key per 4.I.2: non-`[A-Za-z0-9_]` runs become `_`,
/// and non-empty node names suffix the key as `key@nodeName`.
fn prefix_result_keys(result: HashMap<String, String>, node_name: &str) -> HashMap<String, String> {
    result
        .into_iter()
        .map(|(key, value)| {
            let normalised = normalise_key(&key);
            let keyed = if node_name.is_empty() {
                normalised
            } else {
                format!("{normalised}@{node_name}")
            };
            (keyed, value)
        })
        .collect()
}

fn normalise_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut last_was_replaced = false;
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
            last_was_replaced = false;
        } else if !last_was_replaced {
            out.push('_');
            last_was_replaced = true;
        }
    }
    out
}

/// Folds one action's (already key-normalised) results into the
/// cross-action `outputs` map per 4.I.2: `key@nodeName` entries nest under
/// `outputs[nodeName][key]`, bare keys land directly in `outputs[key]`.
fn fold_results(result: HashMap<String, String>, outputs: &mut BTreeMap<String, Value>) {
    for (key, value) in result {
        if let Some((bare_key, node_name)) = key.split_once('@') {
            let node_outputs = outputs
                .entry(node_name.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if let Value::Map(map) = node_outputs {
                map.insert(bare_key.to_string(), Value::String(value));
            }
        } else {
            outputs.insert(key, Value::String(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ScriptExecutor;
    use crate::node_driver::LocalOnlyNodeDriverFactory;
    use flowforge_core::NamespaceId;
    use flowforge_expr::JexlEvaluator;
    use flowforge_flow::{Flow, Variable};
    use flowforge_queue::InMemoryQueue;
    use flowforge_store::{Execution, InMemoryStore};

    fn test_action(id: &str) -> Action {
        Action {
            id: id.to_string(),
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
        }
    }

    fn test_worker() -> (Worker, Arc<InMemoryStore>, Arc<InMemoryQueue>) {
        let store = Arc::new(InMemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        let log_sink = Arc::new(LogSink::new());
        let mut registry = ExecutorRegistry::new();
        registry.register("script", |_id, driver| {
            Box::new(ScriptExecutor::new(driver)) as Box<dyn crate::executor::Executor>
        });
        let approvals = Arc::new(ApprovalCoordinator::new(store.clone(), queue.clone()));

        let worker = Worker::new(
            store.clone(),
            queue.clone(),
            log_sink,
            Arc::new(registry),
            Arc::new(LocalOnlyNodeDriverFactory),
            Arc::new(crate::secrets::NoopSecretsProvider),
            approvals,
            Arc::new(JexlEvaluator::new()),
        );
        (worker, store, queue)
    }

    async fn seed_execution(
        store: &Arc<InMemoryStore>,
        flow: &Flow,
    ) -> (ExecId, NamespaceId) {
        let flow_id = store.create_flow(flow.clone()).await.unwrap();
        let namespace_id = NamespaceId::new();
        let exec_id = ExecId::new();
        store
            .create_execution(Execution::new(exec_id, flow_id, namespace_id))
            .await
            .unwrap();
        (exec_id, namespace_id)
    }

    #[tokio::test]
    async fn sequential_actions_complete_and_merge_outputs() {
        let (worker, store, queue) = test_worker();

        let mut first = test_action("a");
        first.script = vec!["echo one".to_string()];
        let mut second = test_action("b");
        second.script = vec!["echo two".to_string()];

        let flow = Flow {
            slug: "seq".to_string(),
            name: "Sequential".to_string(),
            description: None,
            checksum: String::new(),
            cron_schedule: None,
            inputs: vec![],
            actions: vec![first, second],
        };

        let (exec_id, namespace_id) = seed_execution(&store, &flow).await;

        queue
            .put(flowforge_queue::FlowExecutionPayload {
                workflow: flow,
                input: BTreeMap::new(),
                starting_action_idx: 0,
                exec_id,
                namespace_id,
                trigger_type: flowforge_queue::TriggerType::Manual,
                user_id: flowforge_core::UserId::new(),
            })
            .await
            .unwrap();

        worker.run_once().await.unwrap();

        let execution = store.get_execution(exec_id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn approval_gated_action_suspends_execution() {
        let (worker, store, queue) = test_worker();

        let mut gated = test_action("approve-me");
        gated.approval = true;

        let flow = Flow {
            slug: "gated".to_string(),
            name: "Gated".to_string(),
            description: None,
            checksum: String::new(),
            cron_schedule: None,
            inputs: vec![],
            actions: vec![gated],
        };

        let (exec_id, namespace_id) = seed_execution(&store, &flow).await;

        queue
            .put(flowforge_queue::FlowExecutionPayload {
                workflow: flow,
                input: BTreeMap::new(),
                starting_action_idx: 0,
                exec_id,
                namespace_id,
                trigger_type: flowforge_queue::TriggerType::Manual,
                user_id: flowforge_core::UserId::new(),
            })
            .await
            .unwrap();

        let outcome = worker.run_once().await;
        assert!(matches!(
            outcome,
            Err(SchedulerError::PendingApproval { .. })
        ));

        let execution = store.get_execution(exec_id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Running);
        assert_eq!(execution.current_action_id.as_deref(), Some("approve-me"));
        assert!(queue.get().await.is_err());
    }

    #[tokio::test]
    async fn executor_failure_marks_execution_errored() {
        let (worker, store, queue) = test_worker();

        let mut failing = test_action("boom");
        failing.script = vec!["exit 1".to_string()];

        let flow = Flow {
            slug: "fails".to_string(),
            name: "Fails".to_string(),
            description: None,
            checksum: String::new(),
            cron_schedule: None,
            inputs: vec![],
            actions: vec![failing],
        };

        let (exec_id, namespace_id) = seed_execution(&store, &flow).await;

        queue
            .put(flowforge_queue::FlowExecutionPayload {
                workflow: flow,
                input: BTreeMap::new(),
                starting_action_idx: 0,
                exec_id,
                namespace_id,
                trigger_type: flowforge_queue::TriggerType::Manual,
                user_id: flowforge_core::UserId::new(),
            })
            .await
            .unwrap();

        let outcome = worker.run_once().await;
        assert!(matches!(outcome, Err(SchedulerError::ActionFailed { .. })));

        let execution = store.get_execution(exec_id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Errored);
    }

    #[tokio::test]
    async fn interpolated_variable_flows_into_outputs() {
        let (worker, store, queue) = test_worker();

        let mut action = test_action("greet");
        action.variables = vec![Variable {
            name: "greeting".to_string(),
            value: "hello {{ inputs.name }}".to_string(),
        }];
        action.script = vec!["echo done".to_string()];

        let flow = Flow {
            slug: "greet".to_string(),
            name: "Greet".to_string(),
            description: None,
            checksum: String::new(),
            cron_schedule: None,
            inputs: vec![],
            actions: vec![action],
        };

        let (exec_id, namespace_id) = seed_execution(&store, &flow).await;
        let mut input = BTreeMap::new();
        input.insert("name".to_string(), Value::String("world".to_string()));

        queue
            .put(flowforge_queue::FlowExecutionPayload {
                workflow: flow,
                input,
                starting_action_idx: 0,
                exec_id,
                namespace_id,
                trigger_type: flowforge_queue::TriggerType::Manual,
                user_id: flowforge_core::UserId::new(),
            })
            .await
            .unwrap();

        worker.run_once().await.unwrap();

        let execution = store.get_execution(exec_id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
    }

    #[test]
    fn normalise_key_replaces_invalid_runs() {
        assert_eq!(normalise_key("exit-code"), "exit_code");
        assert_eq!(normalise_key("a..b"), "a_b");
        assert_eq!(normalise_key("plain"), "plain");
    }

    #[test]
    fn fold_results_nests_node_scoped_keys() {
        let mut outputs = BTreeMap::new();
        let mut result = HashMap::new();
        result.insert("url@web1".to_string(), "http://web1".to_string());
        result.insert("status".to_string(), "ok".to_string());

        fold_results(result, &mut outputs);

        assert_eq!(outputs.get("status"), Some(&Value::String("ok".to_string())));
        match outputs.get("web1") {
            Some(Value::Map(map)) => {
                assert_eq!(map.get("url"), Some(&Value::String("http://web1".to_string())));
            }
            other => panic!("expected node-scoped map, got {other:?}"),
        }
    }
}
