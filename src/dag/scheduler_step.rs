// src/dag/scheduler_step.rs

//! Step-by-step result type for the per-run state machine.

use crate::dag::graph::TaskId;

/// What changed when a completion was recorded.
///
/// The async scheduler uses this to emit events and update task statuses;
/// tests use it to step the state machine by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Tasks whose prerequisites all succeeded and that were queued as ready.
    pub newly_ready: Vec<TaskId>,
    /// Tasks resolved as skipped by the cascade during this step.
    pub newly_skipped: Vec<TaskId>,
}

impl SchedulerStep {
    pub fn is_empty(&self) -> bool {
        self.newly_ready.is_empty() && self.newly_skipped.is_empty()
    }
}
