// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ConfigFile;
use crate::dag::{
    DagGraph, RunState, SKIP_PREREQUISITE_FAILED, SKIP_UNRUNNABLE, TaskId, Workflow,
};
use crate::errors::Result;
use crate::exec::pool::{DEFAULT_MAX_IN_FLIGHT, default_blocking_workers};
use crate::exec::{ExecutionEngine, WorkerPool};
use crate::storage::{NoopSink, RunSink};
use crate::types::{Inputs, TaskStatus};

use super::observer::TracingObserver;
use super::{RunEvent, RunObserver, RunResults, TaskResult};

/// Knobs for a [`Scheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Maximum number of task attempts executing at once.
    pub max_in_flight: usize,
    /// Maximum number of blocking bodies executing at once.
    pub blocking_workers: usize,
    /// Reject cyclic graphs before running instead of sweeping their tasks
    /// into "unrunnable" skips afterwards.
    pub strict_acyclic: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            blocking_workers: default_blocking_workers(),
            strict_acyclic: false,
        }
    }
}

impl SchedulerOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            max_in_flight: cfg.workflow.max_in_flight,
            blocking_workers: cfg.workflow.blocking_workers,
            strict_acyclic: cfg.workflow.strict_acyclic,
        }
    }

    pub fn strict(mut self, strict_acyclic: bool) -> Self {
        self.strict_acyclic = strict_acyclic;
        self
    }
}

/// Wavefront scheduler.
///
/// Each call to [`Scheduler::run`] launches every ready task concurrently,
/// wakes as soon as any of them finishes, and feeds completions back into
/// a [`RunState`] which decides what becomes ready or skipped next. All
/// bookkeeping happens on the calling task between awaits; spawned
/// executions only return their [`TaskResult`].
///
/// The observer and sink are shared by every run of this scheduler.
pub struct Scheduler {
    options: SchedulerOptions,
    observer: Arc<dyn RunObserver>,
    sink: Arc<dyn RunSink>,
    engine: ExecutionEngine,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerOptions::default())
    }
}

impl Scheduler {
    /// Scheduler that logs through `tracing` and persists nothing.
    pub fn new(options: SchedulerOptions) -> Self {
        Self::with_parts(options, Arc::new(TracingObserver), Arc::new(NoopSink))
    }

    pub fn with_parts(
        options: SchedulerOptions,
        observer: Arc<dyn RunObserver>,
        sink: Arc<dyn RunSink>,
    ) -> Self {
        let pool = WorkerPool::new(options.max_in_flight, options.blocking_workers);
        let engine = ExecutionEngine::new(pool, Arc::clone(&observer));
        Self {
            options,
            observer,
            sink,
            engine,
        }
    }

    pub fn with_observer(self, observer: Arc<dyn RunObserver>) -> Self {
        Self::with_parts(self.options, observer, self.sink)
    }

    pub fn with_sink(self, sink: Arc<dyn RunSink>) -> Self {
        Self::with_parts(self.options, self.observer, sink)
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Run every task of `workflow` once against `inputs`.
    ///
    /// Fails only on graph definition errors (unknown prerequisites, or a
    /// cycle when `strict_acyclic` is set), before anything executes.
    /// Otherwise returns one result per declared task: task failures are
    /// recorded in the results and never abort the run, and tasks already
    /// running are never cancelled.
    pub async fn run(&self, workflow: &Workflow, inputs: Inputs) -> Result<RunResults> {
        let name = workflow.name();
        let graph = workflow.graph()?;
        if self.options.strict_acyclic {
            workflow.order_of(&graph)?;
        }

        self.observer.on_event(&RunEvent::RunStarted {
            workflow: name,
            task_count: graph.len(),
            inputs: &inputs,
        });

        let mut state = RunState::new(&graph);
        {
            let roots: Vec<&str> = graph.roots().into_iter().map(|id| graph.name(id)).collect();
            self.observer.on_event(&RunEvent::InitialReady {
                workflow: name,
                ready: &roots,
            });
        }

        let mut in_flight: JoinSet<TaskResult> = JoinSet::new();
        let mut launched: HashMap<Id, TaskId> = HashMap::new();

        loop {
            for id in state.take_ready() {
                if state.has_failed_ancestor(id) {
                    let skipped = state.skip(id, SKIP_PREREQUISITE_FAILED);
                    self.mark_skipped(workflow, &graph, &skipped, SKIP_PREREQUISITE_FAILED);
                    continue;
                }
                if state.is_resolved(id) || state.is_running(id) {
                    continue;
                }

                state.mark_running(id);
                self.observer.on_event(&RunEvent::TaskLaunched {
                    workflow: name,
                    task: graph.name(id),
                });

                let task = Arc::clone(&workflow.tasks()[id]);
                let engine = self.engine.clone();
                let inputs = inputs.clone();
                let handle = in_flight.spawn(async move {
                    engine.execute(&task, &inputs).await
                });
                launched.insert(handle.id(), id);
            }

            // Nothing running means nothing left can become ready.
            let Some(first) = in_flight.join_next_with_id().await else {
                break;
            };

            let mut completed = vec![first];
            while let Some(next) = in_flight.try_join_next_with_id() {
                completed.push(next);
            }
            debug!(workflow = name, count = completed.len(), "tasks completed in wake-up");

            for joined in completed {
                let (join_id, result) = match joined {
                    Ok((join_id, result)) => (join_id, result),
                    Err(err) => (err.id(), aborted_result(&err)),
                };

                let Some(id) = launched.remove(&join_id) else {
                    warn!(workflow = name, "completion for unknown execution; ignoring");
                    continue;
                };

                let task = &workflow.tasks()[id];
                if !task.status().is_terminal() {
                    task.set_status(TaskStatus::Failed);
                }

                self.observer.on_event(&RunEvent::TaskFinished {
                    workflow: name,
                    task: graph.name(id),
                    result: &result,
                });

                let step = state.complete(id, result);
                for &child in &step.newly_ready {
                    self.observer.on_event(&RunEvent::TaskUnlocked {
                        workflow: name,
                        task: graph.name(child),
                    });
                }
                self.mark_skipped(workflow, &graph, &step.newly_skipped, SKIP_PREREQUISITE_FAILED);
            }
        }

        for id in state.unresolved() {
            let skipped = state.skip(id, SKIP_UNRUNNABLE);
            self.mark_skipped(workflow, &graph, &skipped, SKIP_UNRUNNABLE);
        }

        let results = state.into_results();
        let run_id = new_run_id(name);
        self.persist(name, &run_id, &results).await;

        let (succeeded, failed, skipped) = count_statuses(workflow);
        self.observer.on_event(&RunEvent::RunCompleted {
            workflow: name,
            run_id: &run_id,
            succeeded,
            failed,
            skipped,
        });

        Ok(results)
    }

    fn mark_skipped(&self, workflow: &Workflow, graph: &DagGraph, ids: &[TaskId], reason: &str) {
        for &id in ids {
            workflow.tasks()[id].set_status(TaskStatus::Skipped);
            self.observer.on_event(&RunEvent::TaskSkipped {
                workflow: workflow.name(),
                task: graph.name(id),
                reason,
            });
        }
    }

    async fn persist(&self, workflow: &str, run_id: &str, results: &RunResults) {
        match self.sink.write_run(run_id, results).await {
            Ok(location) => self.observer.on_event(&RunEvent::RunPersisted {
                workflow,
                run_id,
                location: &location,
            }),
            Err(err) => {
                let error = err.to_string();
                self.observer.on_event(&RunEvent::RunPersistFailed {
                    workflow,
                    run_id,
                    error: &error,
                });
            }
        }
        info!(workflow, run_id, tasks = results.len(), "workflow run finished");
    }
}

/// `<workflow>-<8 hex chars>`.
fn new_run_id(workflow: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{workflow}-{}", &suffix[..8])
}

/// Result for an execution whose tokio task died outside the engine.
fn aborted_result(err: &JoinError) -> TaskResult {
    TaskResult::failed(format!("task execution aborted: {err}"), 0, Utc::now())
}

fn count_statuses(workflow: &Workflow) -> (usize, usize, usize) {
    workflow
        .tasks()
        .iter()
        .fold((0, 0, 0), |(ok, failed, skipped), task| match task.status() {
            TaskStatus::Succeeded => (ok + 1, failed, skipped),
            TaskStatus::Failed => (ok, failed + 1, skipped),
            TaskStatus::Skipped => (ok, failed, skipped + 1),
            _ => (ok, failed, skipped),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use serde_json::json;

    use crate::dag::Task;
    use crate::errors::TaskflowError;
    use crate::exec::{BoxFuture, TaskBody};

    fn ok_task(name: &str) -> Task {
        let out = name.to_string();
        Task::new(
            name,
            TaskBody::from_async_fn(move |_| {
                let out = out.clone();
                async move { Ok::<_, anyhow::Error>(json!(out)) }
            }),
        )
    }

    fn failing_task(name: &str) -> Task {
        Task::new(
            name,
            TaskBody::from_blocking_fn(|_| Err(anyhow!("permanent failure"))),
        )
        .with_max_retries(1)
    }

    fn counting_task(name: &str, calls: Arc<AtomicUsize>) -> Task {
        Task::new(
            name,
            TaskBody::from_blocking_fn(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!(null))
            }),
        )
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl RunObserver for Events {
        fn on_event(&self, event: &RunEvent<'_>) {
            let line = match event {
                RunEvent::TaskLaunched { task, .. } => format!("launch {task}"),
                RunEvent::TaskFinished { task, .. } => format!("finish {task}"),
                RunEvent::TaskSkipped { task, reason, .. } => format!("skip {task}: {reason}"),
                RunEvent::RunPersistFailed { .. } => "persist failed".to_string(),
                RunEvent::RunCompleted {
                    succeeded,
                    failed,
                    skipped,
                    ..
                } => format!("done {succeeded}/{failed}/{skipped}"),
                _ => return,
            };
            self.0.lock().unwrap().push(line);
        }
    }

    impl Events {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn position(&self, line: &str) -> usize {
            self.lines()
                .iter()
                .position(|l| l == line)
                .unwrap_or_else(|| panic!("missing event {line:?}"))
        }
    }

    struct BrokenSink;

    impl RunSink for BrokenSink {
        fn write_run<'a>(
            &'a self,
            _run_id: &'a str,
            _results: &'a RunResults,
        ) -> BoxFuture<'a, Result<String>> {
            Box::pin(async { Err(std::io::Error::other("disk full").into()) })
        }
    }

    fn scheduler(events: Arc<Events>) -> Scheduler {
        Scheduler::new(SchedulerOptions::default()).with_observer(events)
    }

    #[tokio::test]
    async fn join_task_launches_after_both_branches() {
        let mut wf = Workflow::new("diamond");
        wf.add_root(ok_task("A")).unwrap();
        wf.add_task(ok_task("B"), ["A"]).unwrap();
        wf.add_task(ok_task("C"), ["A"]).unwrap();
        wf.add_task(ok_task("D"), ["B", "C"]).unwrap();

        let events = Arc::new(Events::default());
        let results = scheduler(events.clone())
            .run(&wf, Inputs::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert!(results.values().all(TaskResult::ok));
        assert!(wf.tasks().iter().all(|t| t.status() == TaskStatus::Succeeded));
        assert_eq!(results["D"].output(), Some(&json!("D")));

        let launch_d = events.position("launch D");
        assert!(events.position("finish B") < launch_d);
        assert!(events.position("finish C") < launch_d);
        assert_eq!(events.lines().last().map(String::as_str), Some("done 4/0/0"));
    }

    #[tokio::test]
    async fn failed_branch_skips_join_but_not_sibling() {
        let d_calls = Arc::new(AtomicUsize::new(0));

        let mut wf = Workflow::new("diamond");
        wf.add_root(ok_task("A")).unwrap();
        wf.add_task(failing_task("B"), ["A"]).unwrap();
        wf.add_task(ok_task("C"), ["A"]).unwrap();
        wf.add_task(counting_task("D", d_calls.clone()), ["B", "C"])
            .unwrap();

        let events = Arc::new(Events::default());
        let results = scheduler(events.clone())
            .run(&wf, Inputs::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert!(results["C"].ok());
        assert!(!results["B"].ok());
        assert_eq!(results["D"].error(), Some(SKIP_PREREQUISITE_FAILED));
        assert_eq!(wf.task("B").unwrap().status(), TaskStatus::Failed);
        assert_eq!(wf.task("D").unwrap().status(), TaskStatus::Skipped);
        assert_eq!(d_calls.load(Ordering::SeqCst), 0);
        assert!(!events.lines().contains(&"launch D".to_string()));
        assert_eq!(events.lines().last().map(String::as_str), Some("done 2/1/1"));
    }

    #[tokio::test]
    async fn unknown_reference_fails_before_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut wf = Workflow::new("refs");
        wf.add_root(counting_task("A", calls.clone())).unwrap();
        wf.add_task(ok_task("D"), ["Z"]).unwrap();

        let err = Scheduler::default()
            .run(&wf, Inputs::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TaskflowError::UnknownDependencies(ref m) if m.len() == 1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cycle_is_swept_unless_strict() {
        let mut wf = Workflow::new("loop");
        wf.add_root(ok_task("start")).unwrap();
        wf.add_task(ok_task("A"), ["B"]).unwrap();
        wf.add_task(ok_task("B"), ["A"]).unwrap();

        let results = Scheduler::default()
            .run(&wf, Inputs::default())
            .await
            .unwrap();
        assert!(results["start"].ok());
        assert_eq!(results["A"].error(), Some(SKIP_UNRUNNABLE));
        assert_eq!(results["B"].error(), Some(SKIP_UNRUNNABLE));
        assert_eq!(wf.task("A").unwrap().status(), TaskStatus::Skipped);

        let strict = Scheduler::new(SchedulerOptions::default().strict(true));
        let err = strict.run(&wf, Inputs::default()).await.unwrap_err();
        match err {
            TaskflowError::DagCycle { stuck, .. } => {
                assert_eq!(stuck, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("expected DagCycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn persistence_failure_keeps_results() {
        let mut wf = Workflow::new("persist");
        wf.add_root(ok_task("A")).unwrap();

        let events = Arc::new(Events::default());
        let results = scheduler(events.clone())
            .with_sink(Arc::new(BrokenSink))
            .run(&wf, Inputs::default())
            .await
            .unwrap();

        assert!(results["A"].ok());
        assert!(events.lines().contains(&"persist failed".to_string()));
    }

    #[tokio::test]
    async fn empty_workflow_completes_with_no_results() {
        let wf = Workflow::new("empty");
        let results = Scheduler::default()
            .run(&wf, Inputs::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn run_id_has_short_suffix() {
        let id = new_run_id("demo");
        let (prefix, suffix) = id.rsplit_once('-').unwrap();
        assert_eq!(prefix, "demo");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
