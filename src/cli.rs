// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde_json::Value;

use crate::config::default_config_path;

/// Command-line arguments for `taskflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskflow",
    version,
    about = "Run a DAG of tasks concurrently, with per-task retries and failure cascades.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workflow file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run the built-in A -> (B, C) -> D echo workflow instead of a file.
    #[arg(long, conflicts_with = "config")]
    pub demo: bool,

    /// Run input shared by every task, as KEY=VALUE. Repeatable.
    ///
    /// VALUE is parsed as JSON when possible (`delay=0.5`, `flags=[1,2]`),
    /// otherwise taken as a plain string.
    #[arg(long = "input", value_name = "KEY=VALUE", value_parser = parse_input)]
    pub inputs: Vec<(String, Value)>,

    /// Check the graph (references and cycles) and exit.
    #[arg(long)]
    pub validate: bool,

    /// Print the execution order and a Graphviz rendering; run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Fail on cyclic graphs instead of skipping the tasks in the cycle.
    #[arg(long)]
    pub strict: bool,

    /// Directory for run records (overrides `[workflow].runs_dir`).
    #[arg(long, value_name = "DIR")]
    pub runs_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

fn parse_input(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty input name in `{raw}`"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
