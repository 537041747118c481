// src/types.rs

//! Shared vocabulary types: task names, task status and run inputs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Opaque value produced by a successful task body.
pub type Output = Value;

/// Lifecycle status of a task.
///
/// - `Pending` -> `Running` -> `Succeeded` | `Failed` (owned by the execution engine)
/// - `Pending` -> `Skipped` (owned by the scheduler's skip cascade)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TaskStatus {
    Pending = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
    Skipped = 4,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Skipped => "SKIPPED",
        }
    }

    /// `true` for the three states a run can leave a task in.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Skipped
        )
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => TaskStatus::Running,
            2 => TaskStatus::Succeeded,
            3 => TaskStatus::Failed,
            4 => TaskStatus::Skipped,
            _ => TaskStatus::Pending,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "RUNNING" => Ok(TaskStatus::Running),
            "SUCCEEDED" => Ok(TaskStatus::Succeeded),
            "FAILED" => Ok(TaskStatus::Failed),
            "SKIPPED" => Ok(TaskStatus::Skipped),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

/// Status slot owned by a task and written from whichever tokio task is
/// currently driving it.
#[derive(Debug, Default)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn new(status: TaskStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub fn get(&self) -> TaskStatus {
        TaskStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, status: TaskStatus) {
        self.0.store(status as u8, Ordering::Release);
    }
}

/// Named keyword inputs shared (read-only) by every task of a run.
///
/// Cloning is cheap: the map lives behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs(Arc<BTreeMap<String, Value>>);

impl Inputs {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self(Arc::new(values))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String input, if present and a JSON string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Numeric input, if present and a JSON number.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Inputs {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
