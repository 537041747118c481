#![allow(dead_code)]

use std::sync::Arc;

use taskflow::engine::{RunObserver, Scheduler, SchedulerOptions};
use taskflow::storage::RunSink;

pub use taskflow_test_utils::bodies::{Calls, FlakyBody, Gauge, counting};
pub use taskflow_test_utils::builders::{
    ConfigFileBuilder, DIAMOND, TaskConfigBuilder, workflow_from_edges,
};
pub use taskflow_test_utils::recorder::{MemorySink, Recorded, RecordingObserver};
pub use taskflow_test_utils::{init_tracing, with_timeout};

/// Scheduler wired to a recording observer and an in-memory sink.
pub fn recording_scheduler(
    options: SchedulerOptions,
) -> (Scheduler, Arc<RecordingObserver>, Arc<MemorySink>) {
    let observer = RecordingObserver::new();
    let sink = MemorySink::new();
    let scheduler = Scheduler::with_parts(
        options,
        Arc::clone(&observer) as Arc<dyn RunObserver>,
        Arc::clone(&sink) as Arc<dyn RunSink>,
    );
    (scheduler, observer, sink)
}
