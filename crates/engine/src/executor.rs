//! Per-step driver: locking, prerequisite checks, transitions, retries.

use crate::progress::Progress;
use crate::services::Services;
use crate::steps::{run_worker, StepContext};
use aether_adapters::{ConvertService, DimpService, Fetcher, TorchService};
use aether_core::{backoff, should_retry, Clock, ErrorRecord, Job, Status, StepName};
use aether_storage::{JobStore, LockError, StoreError};
use tracing::{error, info};

/// How a step execution was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Normal pipeline advance; a FAILED step blocks.
    Auto,
    /// Explicit resume; a FAILED step is reopened with a fresh budget.
    Resume,
    /// Operator-requested single step; runs regardless of prior outcome.
    Manual,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("another process is executing job {0}")]
    Contended(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Precondition(String),
    /// The step (and therefore the job) transitioned to FAILED.
    #[error("step failed: {0}")]
    StepFailed(ErrorRecord),
}

pub(crate) struct StepExecutor<'a, T, D, V, F, C> {
    pub store: &'a JobStore,
    pub services: &'a Services<T, D, V, F>,
    pub clock: &'a C,
    pub progress: &'a dyn Progress,
}

impl<T, D, V, F, C> StepExecutor<'_, T, D, V, F, C>
where
    T: TorchService,
    D: DimpService,
    V: ConvertService,
    F: Fetcher,
    C: Clock,
{
    /// Run the step at `step_index` of `job_id` to a terminal outcome.
    ///
    /// The job lock is held for the whole execution, including retries.
    /// Every transition is persisted before the next action, so a crash
    /// at any point leaves a resumable state on disk.
    pub async fn execute(
        &self,
        job_id: &str,
        step_index: usize,
        mode: ExecMode,
    ) -> Result<Job, ExecuteError> {
        let _lock = match self.store.try_lock(job_id) {
            Ok(lock) => lock,
            Err(LockError::Contended(id)) => return Err(ExecuteError::Contended(id)),
            Err(LockError::Io(e)) => return Err(ExecuteError::Store(e.into())),
        };

        // Reload under the lock: another process may have advanced the job
        // between the caller's read and our acquisition.
        let mut job = self.store.load(job_id)?;
        let Some(step) = job.steps.get(step_index) else {
            return Err(ExecuteError::Precondition(format!(
                "job {job_id} has no step at index {step_index}"
            )));
        };
        let name = step.name;

        match (step.status, mode) {
            (Status::Completed, ExecMode::Auto | ExecMode::Resume) => return Ok(job),
            (Status::Failed, ExecMode::Auto) => {
                return Err(ExecuteError::Precondition(format!(
                    "step {name} is FAILED; resume the job to retry it"
                )));
            }
            (Status::Failed, ExecMode::Resume | ExecMode::Manual) => {
                job.reopen_step(step_index, self.clock.now_utc());
            }
            _ => {}
        }

        if !job.prerequisites_met(step_index) {
            return Err(ExecuteError::Precondition(format!(
                "step {name} requires every earlier step to be COMPLETED"
            )));
        }

        job.start_step(step_index, self.clock.now_utc());
        self.store.save(&job)?;
        self.progress.step_started(name);
        info!(job_id, step = %name, "step started");

        let retry = job.config.retry.clone();
        let paths = self.store.paths(job_id);
        let mut attempts_this_run = 0u32;
        loop {
            let mut ctx = StepContext {
                job: &mut job,
                step_index,
                store: self.store,
                paths: &paths,
                services: self.services,
                clock: self.clock,
                progress: self.progress,
            };
            match run_worker(&mut ctx).await {
                Ok(report) => {
                    let (files, bytes) = (report.files, report.bytes);
                    job.complete_step(step_index, report, self.clock.now_utc());
                    self.store.save(&job)?;
                    self.progress.step_completed(name);
                    info!(job_id, step = %name, files, bytes, "step completed");
                    return Ok(job);
                }
                Err(err) if should_retry(&err, attempts_this_run, retry.max_attempts) => {
                    let delay =
                        backoff(attempts_this_run, retry.initial_backoff_ms, retry.max_backoff_ms);
                    attempts_this_run += 1;
                    job.record_retry(step_index, err.clone(), self.clock.now_utc());
                    self.store.save(&job)?;
                    info!(
                        job_id,
                        step = %name,
                        attempt = attempts_this_run,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure; retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    job.fail_step(step_index, err.clone(), self.clock.now_utc());
                    self.store.save(&job)?;
                    error!(job_id, step = %name, error = %err, "step failed");
                    return Err(ExecuteError::StepFailed(err));
                }
            }
        }
    }
}

/// Hint printed alongside a permanent failure.
pub fn failure_hint(step: StepName, error: &ErrorRecord) -> &'static str {
    match (step, error.http_status) {
        (StepName::Dimp, Some(413)) => "lower services.dimp.bundle_split_threshold_mb",
        (StepName::Dimp, _) => "check the DIMP service URL and health",
        (StepName::TorchImport, Some(401)) => "check services.torch.username/password",
        (StepName::TorchImport, Some(400)) => "review the CRTDL file for missing cohortDefinition",
        (StepName::TorchImport, _) => "check the TORCH service URL and health",
        (StepName::LocalImport, _) => "fix the malformed input file and resume",
        (StepName::HttpImport, _) => "check that the URL serves NDJSON",
        (StepName::CsvConversion | StepName::ParquetConversion, _) => {
            "check the conversion service URL and health"
        }
        (StepName::Validation, _) => "inspect the job directory contents",
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
