//! Centralized runner configuration.
//!
//! Strongly-typed configuration for the standalone worker pool binary,
//! loaded via the `config` crate from environment variables.

use serde::Deserialize;

/// Runner configuration composed from its section configs.
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// Durable queue configuration.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Worker pool configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Log stream configuration.
    #[serde(default)]
    pub log: LogConfig,

    /// Flow ingest configuration.
    #[serde(default)]
    pub flows: FlowsConfig,
}

/// Durable queue configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Postgres DSN for the durable queue. When unset, the runner falls
    /// back to an in-process queue with no cross-restart durability.
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Number of concurrent worker poll loops.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Backoff between `NoJobs` polls, in milliseconds.
    #[serde(default = "default_poll_backoff_ms")]
    pub poll_backoff_ms: u64,

    /// Per-action upper-bound timeout, in seconds. Ambient; enforcement
    /// lives in the worker loop itself.
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,
}

fn default_worker_count() -> usize {
    4
}

fn default_poll_backoff_ms() -> u64 {
    250
}

fn default_action_timeout_secs() -> u64 {
    3600
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            poll_backoff_ms: default_poll_backoff_ms(),
            action_timeout_secs: default_action_timeout_secs(),
        }
    }
}

/// Log stream configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Retention policy hint for the log stream. Not enforced by the
    /// in-process broadcast sink; a future durable sink would honor it.
    #[serde(default)]
    pub retention: Option<String>,
}

/// Flow ingest configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowsConfig {
    /// Directory of flow definition YAML files to reconcile against the
    /// store on startup. When unset, no flows are ingested and the store
    /// only gains flows a caller creates directly.
    #[serde(default)]
    pub dir: Option<String>,
}

impl RunnerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value fails to parse into its field
    /// type.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_has_correct_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.poll_backoff_ms, 250);
        assert_eq!(config.action_timeout_secs, 3600);
    }
}
