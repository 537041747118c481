// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the wavefront scheduler that drives one run of a workflow ([`runtime`])
//! - the task outcome types it produces ([`result`])
//! - the structured event sink it reports to ([`observer`])
//!
//! The per-run bookkeeping (readiness, skip cascade) is a pure state machine
//! in [`crate::dag::state_manager`]; this module is the async shell around it.

use std::time::Duration;

use crate::types::Inputs;

pub mod observer;
pub mod result;
pub mod runtime;

pub use observer::{CounterObserver, FanoutObserver, TracingObserver};
pub use result::{RunResults, TaskReport, TaskResult};
pub use runtime::{Scheduler, SchedulerOptions};

/// Events emitted while a run progresses.
///
/// Borrowed from the scheduler's state; observers that need to keep data
/// must copy it.
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    /// A run is starting.
    RunStarted {
        workflow: &'a str,
        task_count: usize,
        inputs: &'a Inputs,
    },
    /// Tasks with no prerequisites; empty means the graph cannot start.
    InitialReady {
        workflow: &'a str,
        ready: &'a [&'a str],
    },
    /// A task's execution was handed to the engine.
    TaskLaunched { workflow: &'a str, task: &'a str },
    /// One attempt of a task body failed. `backoff` is `None` when the
    /// retry budget is exhausted and no further attempt follows.
    AttemptFailed {
        task: &'a str,
        attempt: u32,
        max_retries: u32,
        backoff: Option<Duration>,
        error: &'a str,
    },
    /// A launched task reached a terminal result.
    TaskFinished {
        workflow: &'a str,
        task: &'a str,
        result: &'a TaskResult,
    },
    /// All prerequisites of a task resolved successfully.
    TaskUnlocked { workflow: &'a str, task: &'a str },
    /// A task was resolved without running.
    TaskSkipped {
        workflow: &'a str,
        task: &'a str,
        reason: &'a str,
    },
    /// The persistence sink stored the run.
    RunPersisted {
        workflow: &'a str,
        run_id: &'a str,
        location: &'a str,
    },
    /// The persistence sink failed; results are still returned.
    RunPersistFailed {
        workflow: &'a str,
        run_id: &'a str,
        error: &'a str,
    },
    /// Every task has a result.
    RunCompleted {
        workflow: &'a str,
        run_id: &'a str,
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Structured event sink injected into the scheduler and execution engine.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent<'_>);
}
