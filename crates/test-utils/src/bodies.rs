//! Scriptable task bodies for scheduler tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use serde_json::json;
use taskflow::exec::{AsyncBody, BodyResult, BoxFuture, TaskBody};
use taskflow::types::Inputs;

/// Shared invocation counter.
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Fails its first `failures` invocations, then returns `"ok"`.
///
/// `FlakyBody::new(usize::MAX)` never succeeds.
#[derive(Debug, Clone)]
pub struct FlakyBody {
    failures: usize,
    calls: Calls,
}

impl FlakyBody {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: Calls::new(),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(usize::MAX)
    }

    pub fn calls(&self) -> Calls {
        self.calls.clone()
    }

    pub fn body(&self) -> TaskBody {
        TaskBody::cooperative(self.clone())
    }
}

impl AsyncBody for FlakyBody {
    fn run(&self, _inputs: Inputs) -> BoxFuture<'static, BodyResult> {
        let attempt = self.calls.bump();
        let failures = self.failures;
        Box::pin(async move {
            if attempt <= failures {
                Err(anyhow!("flaky failure on attempt {attempt}"))
            } else {
                Ok(json!("ok"))
            }
        })
    }
}

/// Succeeds with `"ok"` and counts invocations.
pub fn counting(calls: &Calls) -> TaskBody {
    let calls = calls.clone();
    TaskBody::from_async_fn(move |_| {
        calls.bump();
        async { Ok::<_, anyhow::Error>(json!("ok")) }
    })
}

/// Tracks how many bodies run at once and the highest value seen.
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// A body that holds the gauge for `hold`, then succeeds.
    pub fn sleeping_body(&self, hold: Duration) -> TaskBody {
        let gauge = self.clone();
        TaskBody::from_async_fn(move |_| {
            let gauge = gauge.clone();
            async move {
                let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
                gauge.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(hold).await;
                gauge.current.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(json!("ok"))
            }
        })
    }

    /// A blocking body that holds the gauge for `hold` on its worker thread.
    pub fn blocking_body(&self, hold: Duration) -> TaskBody {
        let gauge = self.clone();
        TaskBody::from_blocking_fn(move |_| {
            let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
            gauge.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(hold);
            gauge.current.fetch_sub(1, Ordering::SeqCst);
            Ok(json!("ok"))
        })
    }
}
