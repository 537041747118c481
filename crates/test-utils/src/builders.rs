#![allow(dead_code)]

use std::collections::BTreeMap;

use taskflow::config::{ConfigFile, DefaultSection, RawConfigFile, TaskConfig, WorkflowSection};
use taskflow::dag::{Task, Workflow};
use taskflow::exec::TaskBody;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                workflow: WorkflowSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.workflow.name = name.to_string();
        self
    }

    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.config.workflow.max_in_flight = limit;
        self
    }

    pub fn default_retries(mut self, max_retries: u32, backoff_seconds: f64) -> Self {
        self.config.default.max_retries = max_retries;
        self.config.default.retry_backoff_seconds = backoff_seconds;
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                after: vec![],
                max_retries: None,
                retry_backoff_seconds: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.task.max_retries = Some(n);
        self
    }

    pub fn retry_backoff_seconds(mut self, seconds: f64) -> Self {
        self.task.retry_backoff_seconds = Some(seconds);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Build a workflow from `(name, prerequisites)` pairs, asking `body` for
/// each task's body.
pub fn workflow_from_edges(
    name: &str,
    edges: &[(&str, &[&str])],
    mut body: impl FnMut(&str) -> TaskBody,
) -> Workflow {
    let mut wf = Workflow::new(name);
    for (task, deps) in edges {
        wf.add_task(Task::new(*task, body(task)), deps.iter().copied())
            .expect("duplicate task in test graph");
    }
    wf
}

/// A -> (B, C) -> D.
pub const DIAMOND: &[(&str, &[&str])] = &[
    ("A", &[]),
    ("B", &["A"]),
    ("C", &["A"]),
    ("D", &["B", "C"]),
];
