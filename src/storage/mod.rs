// src/storage/mod.rs

//! Persistence of completed runs.
//!
//! The scheduler hands every finished run to a [`RunSink`] exactly once.
//! [`JsonFileSink`] is the production implementation; tests and callers
//! that do not persist can use [`NoopSink`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::RunResults;
use crate::errors::Result;
use crate::exec::BoxFuture;
use crate::types::TaskName;

pub mod json;

pub use json::JsonFileSink;

/// Durable storage for a completed run.
pub trait RunSink: Send + Sync {
    /// Store `results` under `run_id` and return where they went.
    fn write_run<'a>(
        &'a self,
        run_id: &'a str,
        results: &'a RunResults,
    ) -> BoxFuture<'a, Result<String>>;
}

/// Sink that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl RunSink for NoopSink {
    fn write_run<'a>(
        &'a self,
        run_id: &'a str,
        _results: &'a RunResults,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { Ok(format!("noop:{run_id}")) })
    }
}

/// Serialized shape of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub tasks: BTreeMap<TaskName, TaskRecord>,
}

/// Serialized shape of one task outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub ok: bool,
    pub error: Option<String>,
    pub retries: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Seconds.
    pub duration: Option<f64>,
}

impl RunRecord {
    pub fn from_results(run_id: &str, results: &RunResults) -> Self {
        let tasks = results
            .iter()
            .map(|(name, r)| {
                (
                    name.clone(),
                    TaskRecord {
                        ok: r.ok(),
                        error: r.error().map(str::to_string),
                        retries: r.retries(),
                        started_at: r.started_at(),
                        finished_at: r.finished_at(),
                        duration: r.duration_secs(),
                    },
                )
            })
            .collect();

        Self {
            run_id: run_id.to_string(),
            created_at: Utc::now(),
            tasks,
        }
    }
}
