// src/exec/backend.rs

//! Task body abstraction.
//!
//! A task body is anything that can turn the run's [`Inputs`] into an
//! [`Output`] or fail. Two execution strategies sit behind [`TaskBody`]:
//!
//! - [`AsyncBody`]: cooperative; the returned future is polled on the tokio
//!   runtime and may suspend (timers, IO, child processes).
//! - [`BlockingBody`]: synchronous; it is moved onto tokio's blocking pool
//!   and gated by the scheduler's blocking worker limit so a slow body does
//!   not stall the async workers.
//!
//! The execution engine only ever sees a `TaskBody` and never needs to know
//! which concrete task kind it is driving.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::types::{Inputs, Output};

/// Boxed, sendable future, as used at every async trait seam in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a single attempt of a task body yields.
pub type BodyResult = anyhow::Result<Output>;

/// Cooperative task body.
///
/// The returned future must own everything it needs (`'static`) because the
/// engine spawns each attempt on its own tokio task.
pub trait AsyncBody: Send + Sync + 'static {
    fn run(&self, inputs: Inputs) -> BoxFuture<'static, BodyResult>;
}

/// Blocking task body. Occupies a blocking worker for its whole duration.
pub trait BlockingBody: Send + Sync + 'static {
    fn run(&self, inputs: &Inputs) -> BodyResult;
}

/// The work a task performs, tagged with how it must be executed.
#[derive(Clone)]
pub enum TaskBody {
    Cooperative(Arc<dyn AsyncBody>),
    Blocking(Arc<dyn BlockingBody>),
}

impl TaskBody {
    pub fn cooperative(body: impl AsyncBody) -> Self {
        TaskBody::Cooperative(Arc::new(body))
    }

    pub fn blocking(body: impl BlockingBody) -> Self {
        TaskBody::Blocking(Arc::new(body))
    }

    /// Wrap an async closure as a cooperative body.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Inputs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BodyResult> + Send + 'static,
    {
        TaskBody::cooperative(AsyncFn(f))
    }

    /// Wrap a plain closure as a blocking body.
    pub fn from_blocking_fn<F>(f: F) -> Self
    where
        F: Fn(&Inputs) -> BodyResult + Send + Sync + 'static,
    {
        TaskBody::blocking(BlockingFn(f))
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, TaskBody::Blocking(_))
    }
}

impl fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskBody::Cooperative(_) => f.write_str("TaskBody::Cooperative"),
            TaskBody::Blocking(_) => f.write_str("TaskBody::Blocking"),
        }
    }
}

struct AsyncFn<F>(F);

impl<F, Fut> AsyncBody for AsyncFn<F>
where
    F: Fn(Inputs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BodyResult> + Send + 'static,
{
    fn run(&self, inputs: Inputs) -> BoxFuture<'static, BodyResult> {
        Box::pin((self.0)(inputs))
    }
}

struct BlockingFn<F>(F);

impl<F> BlockingBody for BlockingFn<F>
where
    F: Fn(&Inputs) -> BodyResult + Send + Sync + 'static,
{
    fn run(&self, inputs: &Inputs) -> BodyResult {
        (self.0)(inputs)
    }
}
