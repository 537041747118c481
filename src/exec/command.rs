// src/exec/command.rs

//! Shell command task body.

use std::process::Stdio;

use anyhow::{Context, bail};
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::exec::backend::{AsyncBody, BodyResult, BoxFuture};
use crate::types::Inputs;

/// Prefix of the environment variables that carry run inputs to commands.
pub const INPUT_ENV_PREFIX: &str = "TASKFLOW_";

/// Maximum number of stderr bytes quoted in a failure message.
const STDERR_TAIL_BYTES: usize = 2048;

/// Runs a shell command; stdout (trimmed) becomes the task output.
///
/// Each run input `name` is exported as `TASKFLOW_<NAME>`: strings verbatim,
/// everything else as JSON text. A non-zero exit status is a failed attempt.
#[derive(Debug, Clone)]
pub struct CommandTask {
    cmd: String,
}

impl CommandTask {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl AsyncBody for CommandTask {
    fn run(&self, inputs: Inputs) -> BoxFuture<'static, BodyResult> {
        let cmd = self.cmd.clone();
        Box::pin(async move { run_command(&cmd, &inputs).await })
    }
}

async fn run_command(cmd_line: &str, inputs: &Inputs) -> BodyResult {
    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_line);
        c
    };

    for (name, value) in inputs.iter() {
        cmd.env(input_env_name(name), input_env_value(value));
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(cmd = %cmd_line, "spawning command");

    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning command `{cmd_line}`"))?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "command `{cmd_line}` exited with status {code}: {}",
            tail(stderr.trim(), STDERR_TAIL_BYTES)
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(Value::String(stdout.trim().to_string()))
}

/// `message` -> `TASKFLOW_MESSAGE`; characters outside `[A-Za-z0-9_]` become `_`.
pub fn input_env_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{INPUT_ENV_PREFIX}{sanitized}")
}

fn input_env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn tail(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
