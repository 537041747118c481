// tests/persistence.rs

mod common;
use crate::common::*;

use std::sync::Arc;

use taskflow::dag::{SKIP_PREREQUISITE_FAILED, Task, Workflow};
use taskflow::engine::{CounterObserver, Scheduler, SchedulerOptions};
use taskflow::storage::{JsonFileSink, RunRecord};
use taskflow::types::Inputs;

#[tokio::test]
async fn run_record_is_written_once_per_run() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let runs_dir = dir.path().join("runs");

    let mut wf = Workflow::new("persisted");
    wf.add_root(Task::new("A", counting(&Calls::new()))).unwrap();
    wf.add_task(
        Task::new("B", FlakyBody::always_failing().body()).with_max_retries(1),
        ["A"],
    )
    .unwrap();
    wf.add_task(Task::new("C", counting(&Calls::new())), ["B"])
        .unwrap();

    let counters = Arc::new(CounterObserver::new());
    let scheduler = Scheduler::with_parts(
        SchedulerOptions::default(),
        counters.clone(),
        Arc::new(JsonFileSink::new(&runs_dir)),
    );

    let results = with_timeout(scheduler.run(&wf, Inputs::default()))
        .await
        .unwrap();

    let files: Vec<_> = std::fs::read_dir(&runs_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);

    let file_name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("persisted-"));
    assert!(file_name.ends_with(".json"));

    let record: RunRecord =
        serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(format!("{}.json", record.run_id), file_name);
    assert_eq!(record.tasks.len(), results.len());

    assert!(record.tasks["A"].ok);
    assert_eq!(record.tasks["A"].error, None);
    assert!(record.tasks["A"].finished_at.is_some());
    assert!(record.tasks["A"].duration.unwrap() >= 0.0);

    assert!(!record.tasks["B"].ok);
    assert_eq!(record.tasks["B"].retries, 1);

    assert_eq!(
        record.tasks["C"].error.as_deref(),
        Some(SKIP_PREREQUISITE_FAILED)
    );

    let snap = counters.snapshot();
    assert_eq!(snap["tasks_launched"], 2);
    assert_eq!(snap["tasks_succeeded"], 1);
    assert_eq!(snap["tasks_failed"], 1);
    assert_eq!(snap["tasks_skipped"], 1);
    assert_eq!(snap["runs_completed"], 1);
}

#[tokio::test]
async fn unwritable_sink_does_not_lose_results() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the sink expects a directory.
    let blocker = dir.path().join("runs");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let mut wf = Workflow::new("blocked");
    wf.add_root(Task::new("A", counting(&Calls::new()))).unwrap();

    let scheduler = Scheduler::new(SchedulerOptions::default())
        .with_sink(Arc::new(JsonFileSink::new(&blocker)));

    let results = with_timeout(scheduler.run(&wf, Inputs::default()))
        .await
        .unwrap();
    assert!(results["A"].ok());
}
