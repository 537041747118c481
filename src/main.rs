// src/main.rs

use std::process::ExitCode;

use taskflow::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(true) => ExitCode::SUCCESS,
        // Some task failed or was skipped; the report is already on stdout.
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("taskflow error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
