// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskflowError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.workflow, raw.default, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_workflow_section(cfg)?;
    validate_backoff("[default].retry_backoff_seconds", cfg.default.retry_backoff_seconds)?;
    validate_tasks(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_workflow_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.workflow.name.trim().is_empty() {
        return Err(TaskflowError::ConfigError(
            "[workflow].name must not be empty".to_string(),
        ));
    }
    if cfg.workflow.max_in_flight == 0 {
        return Err(TaskflowError::ConfigError(
            "[workflow].max_in_flight must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.workflow.blocking_workers == 0 {
        return Err(TaskflowError::ConfigError(
            "[workflow].blocking_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_backoff(field: &str, seconds: f64) -> Result<()> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TaskflowError::ConfigError(format!(
            "{field} must be a finite, non-negative number (got {seconds})"
        )));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in &cfg.task {
        if task.cmd.trim().is_empty() {
            return Err(TaskflowError::ConfigError(format!(
                "task '{name}' has an empty `cmd`"
            )));
        }
        if let Some(seconds) = task.retry_backoff_seconds {
            validate_backoff(&format!("[task.{name}].retry_backoff_seconds"), seconds)?;
        }
    }
    Ok(())
}
