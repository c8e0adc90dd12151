//! `aether job` - job inspection and manual step execution

use super::{build_orchestrator, job_failure_exit};
use crate::config_file::{self, ConfigOverrides};
use crate::exit_error::{ExitError, EXIT_INVALID};
use crate::output::{print_job_list, print_job_summary};
use crate::progress::TerminalProgress;
use aether_core::{Status, StepName};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// List all jobs, newest first
    List {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,

        /// Configuration file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Run a single step of a job (prerequisites still apply)
    Run {
        /// Job ID
        job_id: String,

        /// Step name, e.g. DIMP or CSV_CONVERSION
        #[arg(long)]
        step: StepName,

        /// Configuration file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

pub async fn run(args: JobArgs) -> Result<(), ExitError> {
    match args.command {
        JobCommand::List { json, config, overrides } => list(json, config.as_deref(), &overrides),
        JobCommand::Run { job_id, step, config, overrides } => {
            run_step(&job_id, step, config.as_deref(), &overrides).await
        }
    }
}

fn list(
    json: bool,
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> Result<(), ExitError> {
    let config = config_file::load(config_path, overrides)
        .map_err(|e| ExitError::new(EXIT_INVALID, format!("{e:#}")))?;
    let store = aether_storage::JobStore::new(&config.jobs_dir);
    let jobs = store.list()?;
    if json {
        let rendered = serde_json::to_string_pretty(&jobs)
            .map_err(|e| ExitError::new(EXIT_INVALID, e.to_string()))?;
        println!("{rendered}");
    } else {
        print_job_list(&jobs);
    }
    Ok(())
}

async fn run_step(
    job_id: &str,
    step: StepName,
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> Result<(), ExitError> {
    let config = config_file::load(config_path, overrides)
        .map_err(|e| ExitError::new(EXIT_INVALID, format!("{e:#}")))?;
    let progress = Arc::new(TerminalProgress::new());
    let orchestrator = build_orchestrator(&config, progress.clone())?;

    let job = orchestrator.run_step(job_id, step).await?;
    progress.finish();
    print_job_summary(&job);

    let step_failed = job
        .steps
        .iter()
        .any(|s| s.name == step && s.status == Status::Failed);
    if step_failed {
        return Err(job_failure_exit(&job));
    }
    Ok(())
}
