// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod storage;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::dag::{Task, Workflow};
use crate::engine::{Scheduler, SchedulerOptions, TracingObserver};
use crate::exec::{EchoTask, TaskBody};
use crate::storage::JsonFileSink;
use crate::storage::json::DEFAULT_RUNS_DIR;
use crate::types::{Inputs, TaskStatus};

/// High-level entry point used by `main.rs`.
///
/// Builds the workflow (from `--config` or `--demo`), then either validates
/// it, prints a dry run, or runs it and prints the per-task report as JSON.
///
/// Returns `Ok(true)` when every task succeeded (or nothing was run).
pub async fn run(args: CliArgs) -> Result<bool> {
    let (workflow, mut options, runs_dir) = if args.demo {
        (
            demo_workflow()?,
            SchedulerOptions::default(),
            PathBuf::from(DEFAULT_RUNS_DIR),
        )
    } else {
        let cfg = load_and_validate(&args.config)?;
        (
            Workflow::from_config(&cfg)?,
            SchedulerOptions::from_config(&cfg),
            cfg.workflow.runs_dir.clone(),
        )
    };
    if args.strict {
        options.strict_acyclic = true;
    }
    let runs_dir = args.runs_dir.clone().unwrap_or(runs_dir);

    if args.validate {
        workflow.validate_acyclic()?;
        println!("workflow '{}' is valid ({} tasks)", workflow.name(), workflow.len());
        return Ok(true);
    }

    if args.dry_run {
        print_dry_run(&workflow)?;
        return Ok(true);
    }

    let inputs: Inputs = args.inputs.into_iter().collect();
    let sink = Arc::new(JsonFileSink::new(runs_dir));
    let scheduler = Scheduler::with_parts(options, Arc::new(TracingObserver), sink.clone());
    info!(
        workflow = workflow.name(),
        tasks = workflow.len(),
        max_in_flight = scheduler.options().max_in_flight,
        runs_dir = %sink.dir().display(),
        "starting run"
    );

    let results = scheduler.run(&workflow, inputs).await?;
    let report = workflow.report(&results);
    println!("{}", serde_json::to_string_pretty(&report)?);

    let all_ok = report.values().all(|r| r.status == TaskStatus::Succeeded);
    info!(workflow = workflow.name(), all_ok, "done");
    Ok(all_ok)
}

/// A -> (B, C) -> D, every task an [`EchoTask`].
pub fn demo_workflow() -> crate::errors::Result<Workflow> {
    let echo = |name: &str| Task::new(name, TaskBody::cooperative(EchoTask));

    let mut wf = Workflow::new("demo");
    wf.add_root(echo("A"))?;
    wf.add_task(echo("B"), ["A"])?;
    wf.add_task(echo("C"), ["A"])?;
    wf.add_task(echo("D"), ["B", "C"])?;
    Ok(wf)
}

/// Print tasks in execution order with their prerequisites, then DOT.
fn print_dry_run(workflow: &Workflow) -> Result<()> {
    let order = workflow.toposort()?;

    println!("taskflow dry-run: {}", workflow.name());
    println!();
    println!("execution order ({}):", order.len());
    for (i, name) in order.iter().enumerate() {
        let deps: Vec<&str> = workflow
            .dependencies_of(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        let policy = workflow
            .task(name)
            .map(|t| t.retry_policy())
            .unwrap_or_default();

        println!("  {}. {name}", i + 1);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
        println!(
            "      retries: {} (backoff {:?})",
            policy.max_retries, policy.retry_backoff
        );
    }
    println!();
    println!("{}", workflow.to_dot());

    debug!("dry-run complete (no execution)");
    Ok(())
}
