//! `aether pipeline` - create and drive pipeline runs

use super::{build_orchestrator, job_failure_exit};
use crate::config_file::{self, ConfigOverrides};
use crate::exit_error::{ExitError, EXIT_INVALID};
use crate::output::print_job_summary;
use crate::progress::TerminalProgress;
use aether_core::Status;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct PipelineArgs {
    #[command(subcommand)]
    pub command: PipelineCommand,
}

#[derive(Subcommand)]
pub enum PipelineCommand {
    /// Create a job from an input source and run it to completion
    Start {
        /// Input: a directory of NDJSON files, an HTTP(S) URL, a CRTDL
        /// file, or a TORCH result URL
        #[arg(long)]
        input: String,

        /// Configuration file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Resume a FAILED or interrupted job
    Continue {
        /// Job ID
        job_id: String,

        /// Configuration file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Print a snapshot of a job
    Status {
        /// Job ID
        job_id: String,

        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,

        /// Configuration file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

pub async fn run(args: PipelineArgs) -> Result<(), ExitError> {
    match args.command {
        PipelineCommand::Start { input, config, overrides } => {
            start(&input, config.as_deref(), &overrides).await
        }
        PipelineCommand::Continue { job_id, config, overrides } => {
            resume(&job_id, config.as_deref(), &overrides).await
        }
        PipelineCommand::Status { job_id, json, config, overrides } => {
            status(&job_id, json, config.as_deref(), &overrides)
        }
    }
}

fn load_config(
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> Result<aether_core::ProjectConfig, ExitError> {
    config_file::load(config_path, overrides)
        .map_err(|e| ExitError::new(EXIT_INVALID, format!("{e:#}")))
}

async fn start(
    input: &str,
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> Result<(), ExitError> {
    let config = load_config(config_path, overrides)?;
    let progress = Arc::new(TerminalProgress::new());
    let orchestrator = build_orchestrator(&config, progress.clone())?;

    let (job, warnings) = orchestrator.create_job(input, config)?;
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
    println!("created job {}", job.job_id);

    let finished = orchestrator.run_job(&job.job_id).await?;
    progress.finish();
    print_job_summary(&finished);
    match finished.status {
        Status::Completed => Ok(()),
        _ => Err(job_failure_exit(&finished)),
    }
}

async fn resume(
    job_id: &str,
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> Result<(), ExitError> {
    let config = load_config(config_path, overrides)?;
    let progress = Arc::new(TerminalProgress::new());
    let orchestrator = build_orchestrator(&config, progress.clone())?;

    let finished = orchestrator.resume_job(job_id).await?;
    progress.finish();
    print_job_summary(&finished);
    match finished.status {
        Status::Completed => Ok(()),
        _ => Err(job_failure_exit(&finished)),
    }
}

fn status(
    job_id: &str,
    json: bool,
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> Result<(), ExitError> {
    let config = load_config(config_path, overrides)?;
    let store = aether_storage::JobStore::new(&config.jobs_dir);
    let job = store.load(job_id)?;
    if json {
        let rendered = serde_json::to_string_pretty(&job)
            .map_err(|e| ExitError::new(EXIT_INVALID, e.to_string()))?;
        println!("{rendered}");
    } else {
        print_job_summary(&job);
    }
    Ok(())
}
