//! Crash-safe persistence of job state.

use crate::lock::{JobLock, LockError};
use crate::paths::JobPaths;
use aether_core::Job;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(String),
    #[error("job {job_id} state is corrupt: {reason}")]
    Corrupt { job_id: String, reason: String },
    #[error("job store io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Store of jobs under a single `jobs_dir`.
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs_dir: PathBuf,
}

impl JobStore {
    pub fn new(jobs_dir: impl Into<PathBuf>) -> Self {
        Self { jobs_dir: jobs_dir.into() }
    }

    pub fn jobs_dir(&self) -> &Path {
        &self.jobs_dir
    }

    pub fn paths(&self, job_id: &str) -> JobPaths {
        JobPaths::new(&self.jobs_dir, job_id)
    }

    /// Create the job directory and its step output directories.
    pub fn create_layout(&self, job_id: &str) -> Result<JobPaths, StoreError> {
        let paths = self.paths(job_id);
        for dir in paths.step_dirs() {
            fs::create_dir_all(dir)?;
        }
        Ok(paths)
    }

    /// Write `state.json` atomically: temp file in the same directory,
    /// fsync, rename over the target. Readers never observe a torn file.
    pub fn save(&self, job: &Job) -> Result<(), StoreError> {
        let paths = self.paths(&job.job_id);
        let state_path = paths.state_file();
        let tmp_path = paths.root().join(".state.json.tmp");

        let bytes = serde_json::to_vec_pretty(job).map_err(|e| StoreError::Corrupt {
            job_id: job.job_id.clone(),
            reason: e.to_string(),
        })?;

        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&bytes)?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &state_path)?;
        Ok(())
    }

    /// Read and parse a job's `state.json`.
    pub fn load(&self, job_id: &str) -> Result<Job, StoreError> {
        let state_path = self.paths(job_id).state_file();
        let bytes = match fs::read(&state_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(job_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            job_id: job_id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Enumerate all jobs, newest first. Entries without a readable state
    /// file are skipped with a warning; they require operator attention
    /// but must not hide the healthy jobs.
    pub fn list(&self) -> Result<Vec<Job>, StoreError> {
        let entries = match fs::read_dir(&self.jobs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut jobs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let job_id = entry.file_name().to_string_lossy().into_owned();
            match self.load(&job_id) {
                Ok(job) => jobs.push(job),
                Err(StoreError::NotFound(_)) => {
                    warn!(%job_id, "skipping job directory without state.json");
                }
                Err(StoreError::Corrupt { reason, .. }) => {
                    warn!(%job_id, %reason, "skipping job with corrupt state.json");
                }
                Err(StoreError::Io(e)) => return Err(e.into()),
            }
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    /// Blocking exclusive lock on a job.
    pub fn lock(&self, job_id: &str) -> Result<JobLock, LockError> {
        JobLock::acquire(&self.paths(job_id).lock_file(), job_id)
    }

    /// Non-blocking exclusive lock; fails fast when another process holds it.
    pub fn try_lock(&self, job_id: &str) -> Result<JobLock, LockError> {
        JobLock::try_acquire(&self.paths(job_id).lock_file(), job_id)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
