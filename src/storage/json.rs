// src/storage/json.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::RunResults;
use crate::errors::Result;
use crate::exec::BoxFuture;

use super::{RunRecord, RunSink};

/// Default directory for run records, relative to the working directory.
pub const DEFAULT_RUNS_DIR: &str = "runs";

/// Writes each run as pretty-printed JSON to `<dir>/<run_id>.json`.
///
/// The directory is created on first write.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }
}

impl Default for JsonFileSink {
    fn default() -> Self {
        Self::new(DEFAULT_RUNS_DIR)
    }
}

impl RunSink for JsonFileSink {
    fn write_run<'a>(
        &'a self,
        run_id: &'a str,
        results: &'a RunResults,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let record = RunRecord::from_results(run_id, results);
            let payload = serde_json::to_string_pretty(&record)?;

            tokio::fs::create_dir_all(&self.dir).await?;
            let path = self.path_for(run_id);
            tokio::fs::write(&path, payload).await?;

            debug!(path = %path.display(), tasks = record.tasks.len(), "wrote run record");
            Ok(path.display().to_string())
        })
    }
}
