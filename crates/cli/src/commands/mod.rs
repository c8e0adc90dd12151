//! CLI command implementations

pub mod job;
pub mod pipeline;

use crate::exit_error::{ExitError, EXIT_INVALID, EXIT_JOB_FAILED};
use aether_adapters::{build_client, HttpConvert, HttpDimp, HttpFetcher, HttpTorch};
use aether_core::{Job, ProjectConfig, Status, SystemClock};
use aether_engine::{failure_hint, Orchestrator, Progress, Services};
use aether_storage::JobStore;
use std::sync::Arc;

pub(crate) type HttpOrchestrator =
    Orchestrator<HttpTorch, HttpDimp, HttpConvert, HttpFetcher, SystemClock>;

pub(crate) fn build_orchestrator(
    config: &ProjectConfig,
    progress: Arc<dyn Progress>,
) -> Result<HttpOrchestrator, ExitError> {
    let client = build_client(&config.services)
        .map_err(|e| ExitError::new(EXIT_INVALID, e.to_string()))?;
    let services = Services::new(
        HttpTorch::new(client.clone()),
        HttpDimp::new(client.clone()),
        HttpConvert::new(client.clone()),
        HttpFetcher::new(client),
    );
    Ok(Orchestrator::new(JobStore::new(&config.jobs_dir), services, SystemClock, progress))
}

/// Exit describing the failed step with an actionable hint.
pub(crate) fn job_failure_exit(job: &Job) -> ExitError {
    let failed = job.steps.iter().find(|s| s.status == Status::Failed);
    let message = match failed {
        Some(step) => match &step.last_error {
            Some(error) => format!(
                "step {} failed: {error}\nhint: {}",
                step.name,
                failure_hint(step.name, error)
            ),
            None => format!("step {} failed", step.name),
        },
        None => job.error_message.clone().unwrap_or_else(|| "job failed".to_string()),
    };
    ExitError::new(EXIT_JOB_FAILED, message)
}
