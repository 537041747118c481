// src/exec/builtin.rs

//! Small built-in task bodies, used by the demo workflow and in tests.

use std::time::Duration;

use serde_json::Value;

use crate::exec::backend::{AsyncBody, BlockingBody, BodyResult, BoxFuture};
use crate::types::Inputs;

/// Cooperative body: waits `delay` seconds, then echoes `message`.
///
/// Inputs: `message` (string, default `"hi"`), `delay` (seconds, default 0).
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoTask;

impl AsyncBody for EchoTask {
    fn run(&self, inputs: Inputs) -> BoxFuture<'static, BodyResult> {
        Box::pin(async move {
            let delay = inputs.get_f64("delay").unwrap_or(0.0);
            if delay > 0.0 {
                tokio::time::sleep(Duration::try_from_secs_f64(delay)?).await;
            }
            let message = inputs.get_str("message").unwrap_or("hi");
            Ok(Value::String(format!("Echo: {message}")))
        })
    }
}

/// Blocking body: formats `message` as printed output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintTask;

impl BlockingBody for PrintTask {
    fn run(&self, inputs: &Inputs) -> BodyResult {
        let message = inputs.get_str("message").unwrap_or("Hello, World!");
        Ok(Value::String(format!("Printed: {message}")))
    }
}
