// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] defines the task body capability ([`TaskBody`]) with its
//!   cooperative and blocking strategies.
//! - [`task_runner`] holds the [`ExecutionEngine`], which drives one task's
//!   retry loop and turns every outcome into a `TaskResult`.
//! - [`pool`] bounds how many attempts (and how many blocking bodies) run at
//!   the same time.
//! - [`command`] runs shell commands via `tokio::process`.
//! - [`builtin`] contains the echo/print bodies used by the demo workflow.

pub mod backend;
pub mod builtin;
pub mod command;
pub mod pool;
pub mod task_runner;

pub use backend::{AsyncBody, BlockingBody, BodyResult, BoxFuture, TaskBody};
pub use builtin::{EchoTask, PrintTask};
pub use command::CommandTask;
pub use pool::WorkerPool;
pub use task_runner::ExecutionEngine;
