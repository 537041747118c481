// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::dag::task::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF};
use crate::exec::pool::{DEFAULT_MAX_IN_FLIGHT, default_blocking_workers};
use crate::storage::json::DEFAULT_RUNS_DIR;

/// Workflow definition exactly as read from a TOML file.
///
/// ```toml
/// [workflow]
/// name = "build"
/// max_in_flight = 8
///
/// [default]
/// max_retries = 3
/// retry_backoff_seconds = 1.0
///
/// [task.compile]
/// cmd = "cargo build"
///
/// [task.test]
/// cmd = "cargo test"
/// after = ["compile"]
/// max_retries = 1
/// ```
///
/// Every section except `[task.<name>]` is optional. Turn it into a
/// [`ConfigFile`] with `ConfigFile::try_from`, which validates it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub workflow: WorkflowSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// Keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated workflow definition.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub workflow: WorkflowSection,
    pub default: DefaultSection,
    pub tasks: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Used by the validator once the raw file passed every check.
    pub(crate) fn new_unchecked(
        workflow: WorkflowSection,
        default: DefaultSection,
        tasks: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            workflow,
            default,
            tasks,
        }
    }

    /// Effective retry budget of a task.
    pub fn max_retries_for(&self, task: &TaskConfig) -> u32 {
        task.max_retries.unwrap_or(self.default.max_retries)
    }

    /// Effective backoff base of a task, in seconds.
    pub fn retry_backoff_for(&self, task: &TaskConfig) -> f64 {
        task.retry_backoff_seconds
            .unwrap_or(self.default.retry_backoff_seconds)
    }
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSection {
    #[serde(default = "default_workflow_name")]
    pub name: String,

    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    #[serde(default = "default_blocking_workers")]
    pub blocking_workers: usize,

    /// Fail the run on a cyclic graph instead of skipping the cycle.
    #[serde(default)]
    pub strict_acyclic: bool,

    /// Where run records are written.
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
}

fn default_workflow_name() -> String {
    "workflow".to_string()
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RUNS_DIR)
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            name: default_workflow_name(),
            max_in_flight: default_max_in_flight(),
            blocking_workers: default_blocking_workers(),
            strict_acyclic: false,
            runs_dir: default_runs_dir(),
        }
    }
}

/// `[default]` section: retry policy for tasks that do not set their own.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultSection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: f64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_backoff_seconds() -> f64 {
    DEFAULT_RETRY_BACKOFF.as_secs_f64()
}

impl Default for DefaultSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_seconds: default_retry_backoff_seconds(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Shell command to run.
    pub cmd: String,

    /// Prerequisites: this task waits for every task listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Overrides `default.max_retries`.
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Overrides `default.retry_backoff_seconds`.
    #[serde(default)]
    pub retry_backoff_seconds: Option<f64>,
}
