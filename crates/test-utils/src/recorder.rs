//! Test doubles for the scheduler's collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskflow::engine::{RunEvent, RunObserver, RunResults};
use taskflow::errors::Result;
use taskflow::exec::BoxFuture;
use taskflow::storage::RunSink;

/// Owned copy of the events a test usually asserts on.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    InitialReady(Vec<String>),
    Launched(String),
    AttemptFailed {
        task: String,
        attempt: u32,
        backoff: Option<Duration>,
    },
    Finished { task: String, ok: bool },
    Unlocked(String),
    Skipped { task: String, reason: String },
    Persisted { run_id: String },
    Completed {
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Observer that keeps every event in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn launched(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Launched(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Index of the first event equal to `event`.
    pub fn position(&self, event: &Recorded) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

impl RunObserver for RecordingObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        let recorded = match *event {
            RunEvent::InitialReady { ready, .. } => {
                Recorded::InitialReady(ready.iter().map(|s| s.to_string()).collect())
            }
            RunEvent::TaskLaunched { task, .. } => Recorded::Launched(task.to_string()),
            RunEvent::AttemptFailed {
                task,
                attempt,
                backoff,
                ..
            } => Recorded::AttemptFailed {
                task: task.to_string(),
                attempt,
                backoff,
            },
            RunEvent::TaskFinished { task, result, .. } => Recorded::Finished {
                task: task.to_string(),
                ok: result.ok(),
            },
            RunEvent::TaskUnlocked { task, .. } => Recorded::Unlocked(task.to_string()),
            RunEvent::TaskSkipped { task, reason, .. } => Recorded::Skipped {
                task: task.to_string(),
                reason: reason.to_string(),
            },
            RunEvent::RunPersisted { run_id, .. } => Recorded::Persisted {
                run_id: run_id.to_string(),
            },
            RunEvent::RunCompleted {
                succeeded,
                failed,
                skipped,
                ..
            } => Recorded::Completed {
                succeeded,
                failed,
                skipped,
            },
            RunEvent::RunStarted { .. } | RunEvent::RunPersistFailed { .. } => return,
        };
        self.events.lock().unwrap().push(recorded);
    }
}

/// Sink that keeps every run in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    runs: Mutex<Vec<(String, RunResults)>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn runs(&self) -> Vec<(String, RunResults)> {
        self.runs.lock().unwrap().clone()
    }
}

impl RunSink for MemorySink {
    fn write_run<'a>(
        &'a self,
        run_id: &'a str,
        results: &'a RunResults,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.runs
                .lock()
                .unwrap()
                .push((run_id.to_string(), results.clone()));
            Ok(format!("memory:{run_id}"))
        })
    }
}
