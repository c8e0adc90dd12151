//! Job lifecycle: create, run, resume, single-step execution, listing.

use crate::executor::{ExecMode, ExecuteError, StepExecutor};
use crate::progress::Progress;
use crate::services::Services;
use aether_adapters::{ConvertService, DimpService, Fetcher, TorchService};
use aether_core::{
    classify, ClassifyError, Clock, ConfigError, ConfigWarning, InputType, Job, ProjectConfig,
    Status, StepName, SystemClock,
};
use aether_storage::{JobStore, StoreError};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("input type {input_type} requires first step {expected}, but enabled_steps starts with {configured}")]
    FirstStepMismatch {
        input_type: InputType,
        expected: StepName,
        configured: StepName,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("another process is executing job {0}")]
    Contended(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Precondition(String),
}

impl From<ExecuteError> for RunError {
    fn from(err: ExecuteError) -> Self {
        match err {
            ExecuteError::Contended(id) => RunError::Contended(id),
            ExecuteError::Store(e) => RunError::Store(e),
            ExecuteError::Precondition(m) => RunError::Precondition(m),
            // Step failures surface through the job state, not as errors.
            ExecuteError::StepFailed(e) => RunError::Precondition(e.to_string()),
        }
    }
}

/// Drives jobs through their step sequence. One orchestrator per process;
/// cross-process safety comes from the per-job lock.
pub struct Orchestrator<T, D, V, F, C = SystemClock> {
    store: JobStore,
    services: Services<T, D, V, F>,
    clock: C,
    progress: Arc<dyn Progress>,
}

impl<T, D, V, F, C> Orchestrator<T, D, V, F, C>
where
    T: TorchService,
    D: DimpService,
    V: ConvertService,
    F: Fetcher,
    C: Clock,
{
    pub fn new(
        store: JobStore,
        services: Services<T, D, V, F>,
        clock: C,
        progress: Arc<dyn Progress>,
    ) -> Self {
        Self { store, services, clock, progress }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn services(&self) -> &Services<T, D, V, F> {
        &self.services
    }

    fn executor(&self) -> StepExecutor<'_, T, D, V, F, C> {
        StepExecutor {
            store: &self.store,
            services: &self.services,
            clock: &self.clock,
            progress: self.progress.as_ref(),
        }
    }

    /// Classify the input, validate the config, and persist a fresh
    /// PENDING job. All validation happens before any directory is
    /// created, so a rejected request leaves no trace on disk.
    pub fn create_job(
        &self,
        input: &str,
        config: ProjectConfig,
    ) -> Result<(Job, Vec<ConfigWarning>), CreateError> {
        let input_type = classify(input)?;
        let warnings = config.validate()?;
        for warning in &warnings {
            warn!(%warning, "configuration accepted with warning");
        }

        let expected = StepName::for_input(input_type);
        let configured = config.pipeline.enabled_steps[0];
        if configured != expected {
            return Err(CreateError::FirstStepMismatch { input_type, expected, configured });
        }

        let job_id = Uuid::new_v4().to_string();
        self.store.create_layout(&job_id)?;
        let mut job = Job::new(&job_id, input, input_type, config, self.clock.now_utc());
        if input_type == InputType::TorchUrl {
            // The input itself is the poll target; no submission happens.
            job.torch_extraction_url = Some(input.to_string());
        }
        self.store.save(&job)?;
        info!(job_id, %input_type, "job created");
        Ok((job, warnings))
    }

    /// Run a job forward until COMPLETED, FAILED, or blocked on a FAILED
    /// step from an earlier run (which requires an explicit resume).
    pub async fn run_job(&self, job_id: &str) -> Result<Job, RunError> {
        self.drive(job_id, false).await
    }

    /// Like [`run_job`](Self::run_job), but a FAILED step is reopened and
    /// retried with a fresh attempt budget.
    pub async fn resume_job(&self, job_id: &str) -> Result<Job, RunError> {
        self.drive(job_id, true).await
    }

    async fn drive(&self, job_id: &str, mut resume: bool) -> Result<Job, RunError> {
        loop {
            let mut job = self.store.load(job_id)?;
            if job.status == Status::Completed {
                return Ok(job);
            }
            if job.status == Status::Failed && !resume {
                return Ok(job);
            }

            let Some(index) = job.next_step() else {
                if job.refresh_completion(self.clock.now_utc()) {
                    self.store.save(&job)?;
                }
                return Ok(job);
            };

            let mode = match job.steps[index].status {
                Status::Failed if resume => ExecMode::Resume,
                Status::Failed => return Ok(job),
                _ => ExecMode::Auto,
            };

            match self.executor().execute(job_id, index, mode).await {
                Ok(_) => {
                    // Only the first executed step of a resume call gets
                    // resume semantics; later steps advance normally.
                    resume = false;
                }
                Err(ExecuteError::StepFailed(_)) => return Ok(self.store.load(job_id)?),
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Operator escape hatch: run one named step, prerequisite checks
    /// still enforced.
    pub async fn run_step(&self, job_id: &str, step: StepName) -> Result<Job, RunError> {
        let job = self.store.load(job_id)?;
        let Some(index) = job.step_index(step) else {
            return Err(RunError::Precondition(format!(
                "step {step} is not part of job {job_id}"
            )));
        };
        match self.executor().execute(job_id, index, ExecMode::Manual).await {
            Ok(job) => Ok(job),
            Err(ExecuteError::StepFailed(_)) => Ok(self.store.load(job_id)?),
            Err(other) => Err(other.into()),
        }
    }

    pub fn load_job(&self, job_id: &str) -> Result<Job, StoreError> {
        self.store.load(job_id)
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.store.list()
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
