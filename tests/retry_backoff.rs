// tests/retry_backoff.rs

mod common;
use crate::common::*;

use std::time::Duration;

use taskflow::dag::{RetryPolicy, Task, Workflow};
use taskflow::engine::SchedulerOptions;
use taskflow::types::{Inputs, TaskStatus};
use tokio::time::Instant;

fn single(task: Task) -> Workflow {
    let mut wf = Workflow::new("retry");
    wf.add_root(task).unwrap();
    wf
}

fn backoffs(observer: &RecordingObserver) -> Vec<Option<Duration>> {
    observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Recorded::AttemptFailed { backoff, .. } => Some(backoff),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn success_after_k_failures_reports_k_and_waits_linearly() {
    let flaky = FlakyBody::new(2);
    let wf = single(
        Task::new("T", flaky.body())
            .with_retry_policy(RetryPolicy::new(3, Duration::from_secs(1))),
    );
    let (scheduler, observer, _sink) = recording_scheduler(SchedulerOptions::default());

    let start = Instant::now();
    let results = with_timeout(scheduler.run(&wf, Inputs::default()))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    let t = &results["T"];
    assert!(t.ok());
    assert_eq!(t.retries(), 2);
    assert_eq!(flaky.calls().get(), 3);
    assert_eq!(wf.task("T").unwrap().status(), TaskStatus::Succeeded);

    // 1s after the first failure, 2s after the second.
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");
    assert_eq!(
        backoffs(&observer),
        vec![Some(Duration::from_secs(1)), Some(Duration::from_secs(2))]
    );
}

#[tokio::test(start_paused = true)]
async fn exhausting_retries_reports_failure_with_last_error() {
    let flaky = FlakyBody::always_failing();
    let wf = single(
        Task::new("T", flaky.body())
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(500))),
    );
    let (scheduler, observer, _sink) = recording_scheduler(SchedulerOptions::default());

    let start = Instant::now();
    let results = with_timeout(scheduler.run(&wf, Inputs::default()))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    let t = &results["T"];
    assert!(!t.ok());
    assert_eq!(t.retries(), 3);
    assert!(t.output().is_none());
    assert!(t.error().unwrap().contains("flaky failure on attempt 3"));
    assert_eq!(wf.task("T").unwrap().status(), TaskStatus::Failed);
    assert_eq!(flaky.calls().get(), 3);

    // 0.5s + 1.0s; no wait after the final attempt.
    assert!(elapsed >= Duration::from_millis(1500), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1600), "elapsed {elapsed:?}");
    assert_eq!(
        backoffs(&observer),
        vec![
            Some(Duration::from_millis(500)),
            Some(Duration::from_secs(1)),
            None
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn zero_retries_means_single_attempt() {
    let flaky = FlakyBody::new(1);
    let wf = single(Task::new("T", flaky.body()).with_max_retries(0));
    let (scheduler, _observer, _sink) = recording_scheduler(SchedulerOptions::default());

    let results = with_timeout(scheduler.run(&wf, Inputs::default()))
        .await
        .unwrap();

    assert!(!results["T"].ok());
    assert_eq!(results["T"].retries(), 1);
    assert_eq!(flaky.calls().get(), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_of_one_task_does_not_stall_siblings() {
    let flaky = FlakyBody::new(1);
    let sibling = Calls::new();

    let mut wf = Workflow::new("siblings");
    wf.add_root(
        Task::new("slow", flaky.body())
            .with_retry_policy(RetryPolicy::new(2, Duration::from_secs(2))),
    )
    .unwrap();
    wf.add_root(Task::new("fast", counting(&sibling))).unwrap();
    wf.add_task(Task::new("after_fast", counting(&sibling)), ["fast"])
        .unwrap();

    let (scheduler, observer, _sink) = recording_scheduler(SchedulerOptions::default());
    let results = with_timeout(scheduler.run(&wf, Inputs::default()))
        .await
        .unwrap();

    assert!(results.values().all(|r| r.ok()));
    assert_eq!(results["slow"].retries(), 1);
    assert_eq!(sibling.get(), 2);

    let retry_started = observer
        .position(&Recorded::AttemptFailed {
            task: "slow".into(),
            attempt: 1,
            backoff: Some(Duration::from_secs(2)),
        })
        .unwrap();
    let slow_done = observer
        .position(&Recorded::Finished {
            task: "slow".into(),
            ok: true,
        })
        .unwrap();
    let downstream_done = observer
        .position(&Recorded::Finished {
            task: "after_fast".into(),
            ok: true,
        })
        .unwrap();
    assert!(retry_started < slow_done);
    assert!(downstream_done < slow_done, "dependent of `fast` ran during the backoff");
}
