// src/dag/task.rs

//! Task definition: name, retry policy, body and live status.

use std::time::Duration;

use crate::exec::TaskBody;
use crate::types::{StatusCell, TaskName, TaskStatus};

/// Default number of attempts before a task is reported as failed.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Per-task retry policy, fixed when the task is created.
///
/// `max_retries` bounds the number of *failed* attempts: the engine stops
/// as soon as the failure count reaches it, so `0` and `1` both mean a
/// single attempt. The wait after the n-th failure is `retry_backoff * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            max_retries,
            retry_backoff,
        }
    }

    /// Whether `failed_attempts` failures exhaust this policy.
    pub fn exhausted(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.max_retries
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        self.retry_backoff.saturating_mul(failed_attempts)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF)
    }
}

/// A named unit of work.
///
/// The status field is written only by the execution engine
/// (`Running` -> `Succeeded`/`Failed`) and by the scheduler's skip cascade
/// (`Pending` -> `Skipped`).
#[derive(Debug)]
pub struct Task {
    name: TaskName,
    retry: RetryPolicy,
    body: TaskBody,
    status: StatusCell,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, body: TaskBody) -> Self {
        Self {
            name: name.into(),
            retry: RetryPolicy::default(),
            body,
            status: StatusCell::new(TaskStatus::Pending),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry.retry_backoff = backoff;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn body(&self) -> &TaskBody {
        &self.body
    }

    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    pub(crate) fn set_status(&self, status: TaskStatus) {
        self.status.set(status);
    }
}
