// src/engine/observer.rs

//! Stock [`RunObserver`] implementations.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, info, warn};

use super::{RunEvent, RunObserver};

/// Logs every event through `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        match *event {
            RunEvent::RunStarted {
                workflow,
                task_count,
                inputs,
            } => {
                let inputs: Vec<&str> = inputs.keys().collect();
                info!(workflow, task_count, ?inputs, "workflow run starting");
            }
            RunEvent::InitialReady { workflow, ready } => {
                if ready.is_empty() {
                    warn!(workflow, "no initial ready tasks (graph may be invalid)");
                } else {
                    info!(workflow, ?ready, "initial ready tasks");
                }
            }
            RunEvent::TaskLaunched { workflow, task } => {
                info!(workflow, task, "launching task");
            }
            RunEvent::AttemptFailed {
                task,
                attempt,
                max_retries,
                backoff,
                error,
            } => match backoff {
                Some(delay) => warn!(
                    task,
                    attempt,
                    max_retries,
                    backoff_ms = delay.as_millis() as u64,
                    error,
                    "task attempt failed; retrying after backoff"
                ),
                None => warn!(
                    task,
                    attempt, max_retries, error, "task attempt failed; retries exhausted"
                ),
            },
            RunEvent::TaskFinished {
                workflow,
                task,
                result,
            } => {
                info!(
                    workflow,
                    task,
                    ok = result.ok(),
                    retries = result.retries(),
                    duration_s = result.duration_secs().unwrap_or_default(),
                    "task finished"
                );
            }
            RunEvent::TaskUnlocked { workflow, task } => {
                info!(workflow, task, "prerequisites satisfied; task unlocked");
            }
            RunEvent::TaskSkipped {
                workflow,
                task,
                reason,
            } => {
                info!(workflow, task, reason, "task skipped");
            }
            RunEvent::RunPersisted {
                workflow,
                run_id,
                location,
            } => {
                info!(workflow, run_id, location, "run results saved");
            }
            RunEvent::RunPersistFailed {
                workflow,
                run_id,
                error,
            } => {
                error!(workflow, run_id, error, "failed to save run results");
            }
            RunEvent::RunCompleted {
                workflow,
                run_id,
                succeeded,
                failed,
                skipped,
            } => {
                info!(
                    workflow,
                    run_id, succeeded, failed, skipped, "workflow run complete"
                );
            }
        }
    }
}

/// Process-lifetime counters, fed from run events.
#[derive(Debug, Default)]
pub struct CounterObserver {
    tasks_launched: AtomicU64,
    tasks_succeeded: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_skipped: AtomicU64,
    task_retries: AtomicU64,
    runs_completed: AtomicU64,
}

impl CounterObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter values keyed by metric name.
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        [
            ("tasks_launched", &self.tasks_launched),
            ("tasks_succeeded", &self.tasks_succeeded),
            ("tasks_failed", &self.tasks_failed),
            ("tasks_skipped", &self.tasks_skipped),
            ("task_retries", &self.task_retries),
            ("runs_completed", &self.runs_completed),
        ]
        .into_iter()
        .map(|(name, counter)| (name, counter.load(Ordering::Relaxed)))
        .collect()
    }

    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl RunObserver for CounterObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::TaskLaunched { .. } => Self::inc(&self.tasks_launched),
            RunEvent::AttemptFailed {
                backoff: Some(_), ..
            } => Self::inc(&self.task_retries),
            RunEvent::TaskFinished { result, .. } => {
                if result.ok() {
                    Self::inc(&self.tasks_succeeded)
                } else {
                    Self::inc(&self.tasks_failed)
                }
            }
            RunEvent::TaskSkipped { .. } => Self::inc(&self.tasks_skipped),
            RunEvent::RunCompleted { .. } => Self::inc(&self.runs_completed),
            _ => {}
        }
    }
}

/// Forwards each event to several observers, in order.
#[derive(Clone, Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn RunObserver>>,
}

impl FanoutObserver {
    pub fn with(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl RunObserver for FanoutObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
