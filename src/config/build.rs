// src/config/build.rs

use std::time::Duration;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::dag::{RetryPolicy, Task, Workflow};
use crate::errors::{Result, TaskflowError};
use crate::exec::{CommandTask, TaskBody};

impl Workflow {
    /// Build a workflow of shell command tasks from a validated config.
    ///
    /// Tasks are added in name order. Prerequisites are taken verbatim, so
    /// unknown names and cycles surface from [`Workflow::graph`] and
    /// [`Workflow::toposort`] like for any other workflow.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut workflow = Workflow::new(cfg.workflow.name.clone());

        for (name, task_cfg) in &cfg.tasks {
            let seconds = cfg.retry_backoff_for(task_cfg);
            let backoff = Duration::try_from_secs_f64(seconds).map_err(|e| {
                TaskflowError::ConfigError(format!(
                    "task '{name}' has an unusable retry backoff ({seconds}s): {e}"
                ))
            })?;
            let policy = RetryPolicy::new(cfg.max_retries_for(task_cfg), backoff);

            debug!(task = %name, cmd = %task_cfg.cmd, after = ?task_cfg.after, "configured task");

            let body = TaskBody::cooperative(CommandTask::new(&task_cfg.cmd));
            let task = Task::new(name.clone(), body).with_retry_policy(policy);
            workflow.add_task(task, task_cfg.after.iter().cloned())?;
        }

        Ok(workflow)
    }
}
