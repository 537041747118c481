// src/errors.rs

//! Crate-wide error type and aliases.
//!
//! Graph-structure problems are always surfaced to the caller before any
//! task runs. Task body failures never show up here: the execution engine
//! folds them into a `TaskResult`.

use std::fmt;

use thiserror::Error;

use crate::types::TaskName;

/// One `(task, missing prerequisite)` pair found during reference validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    pub task: TaskName,
    pub prerequisite: TaskName,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.task, self.prerequisite)
    }
}

#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task with name {0} already exists in the workflow")]
    DuplicateTask(TaskName),

    #[error("Unknown dependency reference(s): {}", join_missing(.0))]
    UnknownDependencies(Vec<MissingDependency>),

    #[error("Cycle detected in workflow '{workflow}'. Nodes involved: {stuck:?}")]
    DagCycle {
        workflow: String,
        stuck: Vec<TaskName>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskflowError {
    /// Duplicate names and dangling references: mistakes made while building
    /// the graph, as opposed to cycles or IO problems.
    pub fn is_graph_definition(&self) -> bool {
        matches!(
            self,
            TaskflowError::DuplicateTask(_) | TaskflowError::UnknownDependencies(_)
        )
    }
}

fn join_missing(missing: &[MissingDependency]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskflowError>;
