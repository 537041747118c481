// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a workflow file without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Deserialize a workflow definition from TOML text.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a workflow file and validate it.
///
/// Checks the file's own sanity (tasks present, limits, backoff values).
/// Graph structure is left to [`crate::dag::Workflow`], which reports
/// unknown prerequisites and cycles with the same errors for configured
/// and programmatic workflows.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Taskflow.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskflow.toml")
}
