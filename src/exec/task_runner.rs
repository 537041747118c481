// src/exec/task_runner.rs

//! Execution engine: drives one task's retry loop and produces its result.

use std::any::Any;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tokio::task::JoinError;
use tracing::debug;

use crate::dag::Task;
use crate::engine::{RunEvent, RunObserver, TaskResult};
use crate::exec::backend::{BodyResult, TaskBody};
use crate::exec::pool::WorkerPool;
use crate::types::{Inputs, TaskStatus};

/// Runs task bodies with retries.
///
/// Cheap to clone; the scheduler hands a clone to every spawned execution.
#[derive(Clone)]
pub struct ExecutionEngine {
    pool: WorkerPool,
    observer: Arc<dyn RunObserver>,
}

impl ExecutionEngine {
    pub fn new(pool: WorkerPool, observer: Arc<dyn RunObserver>) -> Self {
        Self { pool, observer }
    }

    /// Execute `task` until it succeeds or its retry budget is spent.
    ///
    /// Never fails: body errors and panics are folded into the returned
    /// [`TaskResult`]. `retries` counts the failed attempts seen before the
    /// outcome (so a success on the first try reports 0).
    pub async fn execute(&self, task: &Task, inputs: &Inputs) -> TaskResult {
        task.set_status(TaskStatus::Running);
        let started_at = Utc::now();
        let policy = task.retry_policy();
        let mut attempt: u32 = 0;

        loop {
            match self.run_attempt(task.body(), inputs).await {
                Ok(output) => {
                    task.set_status(TaskStatus::Succeeded);
                    debug!(task = task.name(), retries = attempt, "task body succeeded");
                    return TaskResult::succeeded(output, attempt, started_at);
                }
                Err(err) => {
                    attempt += 1;
                    let error = format!("{err:?}");

                    if policy.exhausted(attempt) {
                        self.observer.on_event(&RunEvent::AttemptFailed {
                            task: task.name(),
                            attempt,
                            max_retries: policy.max_retries,
                            backoff: None,
                            error: &error,
                        });
                        task.set_status(TaskStatus::Failed);
                        return TaskResult::failed(error, attempt, started_at);
                    }

                    let delay = policy.backoff_for(attempt);
                    self.observer.on_event(&RunEvent::AttemptFailed {
                        task: task.name(),
                        attempt,
                        max_retries: policy.max_retries,
                        backoff: Some(delay),
                        error: &error,
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One invocation of the body, holding an execution slot for its duration.
    ///
    /// Blocking bodies wait for a blocking worker before they take an
    /// execution slot, so queued blocking work never holds slots that
    /// cooperative tasks could use. The body is invoked inside the spawned
    /// task so any panic, including one raised while building the future,
    /// surfaces as a failed attempt.
    async fn run_attempt(&self, body: &TaskBody, inputs: &Inputs) -> BodyResult {
        let inputs = inputs.clone();
        match body {
            TaskBody::Cooperative(body) => {
                let _slot = self.pool.acquire().await;
                let body = Arc::clone(body);
                let joined = tokio::spawn(async move { body.run(inputs).await }).await;
                join_outcome(joined)
            }
            TaskBody::Blocking(body) => {
                let _worker = self.pool.acquire_blocking().await;
                let _slot = self.pool.acquire().await;
                let body = Arc::clone(body);
                let joined = tokio::task::spawn_blocking(move || body.run(&inputs)).await;
                join_outcome(joined)
            }
        }
    }
}

fn join_outcome(joined: Result<BodyResult, JoinError>) -> BodyResult {
    match joined {
        Ok(result) => result,
        Err(err) if err.is_panic() => Err(anyhow!(
            "task body panicked: {}",
            panic_message(err.into_panic())
        )),
        Err(err) => Err(anyhow!("task body did not complete: {err}")),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use anyhow::bail;
    use serde_json::json;

    use crate::engine::TracingObserver;

    fn engine() -> ExecutionEngine {
        ExecutionEngine::new(WorkerPool::new(4, 2), Arc::new(TracingObserver))
    }

    #[tokio::test]
    async fn first_try_success_reports_zero_retries() {
        let task = Task::new(
            "ok",
            TaskBody::from_async_fn(|_| async { Ok::<_, anyhow::Error>(json!("fine")) }),
        );

        let res = engine().execute(&task, &Inputs::default()).await;

        assert!(res.ok());
        assert_eq!(res.retries(), 0);
        assert_eq!(res.output(), Some(&json!("fine")));
        assert_eq!(task.status(), TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn zero_max_retries_means_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let task = Task::new(
            "once",
            TaskBody::from_blocking_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                bail!("nope")
            }),
        )
        .with_max_retries(0)
        .with_retry_backoff(Duration::ZERO);

        let res = engine().execute(&task, &Inputs::default()).await;

        assert!(!res.ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(res.retries(), 1);
        assert!(res.error().unwrap().contains("nope"));
        assert_eq!(task.status(), TaskStatus::Failed);
    }

    #[tokio::test]
    async fn panicking_body_becomes_failed_result() {
        let task = Task::new(
            "panics",
            TaskBody::from_async_fn(|_| async {
                if true {
                    panic!("kaboom");
                }
                Ok::<_, anyhow::Error>(json!(null))
            }),
        )
        .with_max_retries(1);

        let res = engine().execute(&task, &Inputs::default()).await;

        assert!(!res.ok());
        let err = res.error().unwrap();
        assert!(err.contains("panicked"), "unexpected error text: {err}");
        assert!(err.contains("kaboom"), "unexpected error text: {err}");
    }

    /// Panics on its first invocation before any future exists.
    struct PanicsOnFirstCall(AtomicU32);

    impl crate::exec::AsyncBody for PanicsOnFirstCall {
        fn run(&self, _inputs: Inputs) -> crate::exec::BoxFuture<'static, BodyResult> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("eager kaboom");
            }
            Box::pin(async { Ok(json!("recovered")) })
        }
    }

    #[tokio::test]
    async fn panic_while_building_future_is_retried() {
        let task = Task::new(
            "eager",
            TaskBody::cooperative(PanicsOnFirstCall(AtomicU32::new(0))),
        )
        .with_max_retries(2)
        .with_retry_backoff(Duration::ZERO);

        let res = engine().execute(&task, &Inputs::default()).await;

        assert!(res.ok(), "{:?}", res.error());
        assert_eq!(res.retries(), 1);
        assert_eq!(res.output(), Some(&json!("recovered")));
        assert_eq!(task.status(), TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn error_text_includes_cause_chain() {
        let task = Task::new(
            "chain",
            TaskBody::from_blocking_fn(|_| {
                let inner: anyhow::Result<()> = Err(anyhow!("disk full"));
                inner.map_err(|e| e.context("writing artifact"))?;
                Ok(json!(null))
            }),
        )
        .with_max_retries(1);

        let res = engine().execute(&task, &Inputs::default()).await;
        let err = res.error().unwrap();

        assert!(err.contains("writing artifact"));
        assert!(err.contains("disk full"));
    }
}
