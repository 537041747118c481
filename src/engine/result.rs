// src/engine/result.rs

//! Task outcomes as produced by the execution engine or the skip cascade.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Output, TaskName, TaskStatus};

/// Outcome of one task in one run.
///
/// Built once, by the execution engine or the scheduler's skip path, and
/// never mutated afterwards; fields are only readable.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    ok: bool,
    output: Option<Output>,
    error: Option<String>,
    retries: u32,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TaskResult {
    pub(crate) fn succeeded(output: Output, retries: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            ok: true,
            output: Some(output),
            error: None,
            retries,
            started_at,
            finished_at: Some(Utc::now()),
        }
    }

    pub(crate) fn failed(error: String, retries: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            ok: false,
            output: None,
            error: Some(error),
            retries,
            started_at,
            finished_at: Some(Utc::now()),
        }
    }

    /// Result for a task that was never executed.
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            ok: false,
            output: None,
            error: Some(reason.into()),
            retries: 0,
            started_at: now,
            finished_at: Some(now),
        }
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn output(&self) -> Option<&Output> {
        self.output.as_ref()
    }

    /// Formatted failure text; `None` when `ok` is true.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of failed attempts recorded before the final outcome.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// `finished_at - started_at`, or `None` while unfinished.
    pub fn duration(&self) -> Option<Duration> {
        let finished = self.finished_at?;
        Some((finished - self.started_at).to_std().unwrap_or(Duration::ZERO))
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration().map(|d| d.as_secs_f64())
    }
}

/// Per-task outcomes of one run, keyed by task name.
pub type RunResults = BTreeMap<TaskName, TaskResult>;

/// Caller-facing summary of one task after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub status: TaskStatus,
    pub ok: bool,
    pub duration: Option<f64>,
    pub retries: u32,
    pub error: Option<String>,
}

impl TaskReport {
    pub fn new(status: TaskStatus, result: &TaskResult) -> Self {
        Self {
            status,
            ok: result.ok(),
            duration: result.duration_secs(),
            retries: result.retries(),
            error: result.error().map(str::to_string),
        }
    }
}
