mod config;
mod ingest;

use config::RunnerConfig;
use flowforge_expr::JexlEvaluator;
use flowforge_queue::{DurableQueue, InMemoryQueue, PostgresQueue};
use flowforge_scheduler::{
    run_ticker, ApprovalCoordinator, ExecutorRegistry, LocalOnlyNodeDriverFactory, LogSink,
    NoopSecretsProvider, SchedulerError, ScriptExecutor, Worker,
};
use flowforge_store::{InMemoryStore, Store};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RunnerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    if let Some(retention) = &config.log.retention {
        tracing::info!(retention, "log stream retention hint (not enforced)");
    }

    let queue: Arc<dyn DurableQueue> = match &config.queue.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to durable queue database...");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .expect("failed to connect to queue database");
            let queue = PostgresQueue::new(pool);
            queue
                .initialize()
                .await
                .expect("failed to initialize job_queue schema");
            Arc::new(queue)
        }
        None => {
            tracing::warn!(
                "QUEUE__DATABASE_URL not set, using an in-process queue with no \
                 cross-restart durability"
            );
            Arc::new(InMemoryQueue::new())
        }
    };

    // No SQL-backed Store implementation exists; flows, executions, and
    // approvals live in process memory for the lifetime of this binary.
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

    if let Some(dir) = &config.flows.dir {
        tracing::info!(dir, "reconciling flow definitions");
        if let Err(e) = ingest::reconcile_flow_dir(store.as_ref(), dir).await {
            tracing::warn!(dir, error = %e, "failed to read flow definitions directory");
        }
    }

    let log_sink = Arc::new(LogSink::new());
    let evaluator = Arc::new(JexlEvaluator::new());
    let node_driver_factory = Arc::new(LocalOnlyNodeDriverFactory);
    let secrets = Arc::new(NoopSecretsProvider);
    let approvals = Arc::new(ApprovalCoordinator::new(store.clone(), queue.clone()));

    let mut registry = ExecutorRegistry::new();
    registry.register("script", |_id, driver| {
        Box::new(ScriptExecutor::new(driver)) as Box<dyn flowforge_scheduler::Executor>
    });
    let registry = Arc::new(registry);

    let action_timeout = Duration::from_secs(config.scheduler.action_timeout_secs);
    let poll_backoff = Duration::from_millis(config.scheduler.poll_backoff_ms);

    let mut tasks = tokio::task::JoinSet::new();

    tasks.spawn(run_ticker(store.clone(), queue.clone()));

    for worker_idx in 0..config.scheduler.worker_count {
        let worker = Worker::with_action_timeout(
            store.clone(),
            queue.clone(),
            log_sink.clone(),
            registry.clone(),
            node_driver_factory.clone(),
            secrets.clone(),
            approvals.clone(),
            evaluator.clone(),
            action_timeout,
        );

        tasks.spawn(async move {
            tracing::info!(worker_idx, "worker loop started");
            loop {
                match worker.run_once().await {
                    Ok(()) => {}
                    Err(SchedulerError::NoJobs) => {
                        tokio::time::sleep(poll_backoff).await;
                    }
                    Err(SchedulerError::PendingApproval { .. }) => {
                        tracing::debug!(worker_idx, "execution suspended pending approval");
                    }
                    Err(e) => {
                        tracing::warn!(worker_idx, error = %e, "worker iteration failed");
                    }
                }
            }
        });
    }

    tracing::info!(
        worker_count = config.scheduler.worker_count,
        "runner started"
    );

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "a runner task panicked");
        }
    }
}
