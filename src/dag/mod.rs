// src/dag/mod.rs

//! Task graph definition and per-run scheduling state.
//!
//! - [`task`] defines a task: name, retry policy, body and live status.
//! - [`workflow`] holds a graph definition and its validation entry points.
//! - [`graph`] is the indexed arena built from a workflow (ids, edges in
//!   both directions, Kahn's algorithm).
//! - [`state_manager`] tracks readiness and the skip cascade for one run.
//! - [`scheduler_step`] defines the result type for state machine steps.

pub mod graph;
pub mod scheduler_step;
pub mod state_manager;
pub mod task;
pub mod workflow;

pub use graph::{DagGraph, TaskId};
pub use scheduler_step::SchedulerStep;
pub use state_manager::{RunState, SKIP_PREREQUISITE_FAILED, SKIP_UNRUNNABLE};
pub use task::{RetryPolicy, Task};
pub use workflow::Workflow;
