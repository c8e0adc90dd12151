//! Cross-process exclusive job locking.
//!
//! An OS-level exclusive lock on the `state.lock` sentinel guards all
//! writes and the read-modify-write cycle of a step execution. Readers
//! never take the lock; atomic renames keep their snapshots consistent.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("job {0} is locked by another process")]
    Contended(String),
    #[error("failed to acquire job lock: {0}")]
    Io(#[from] std::io::Error),
}

/// Held exclusive lock on a job. Released on drop or process exit.
#[derive(Debug)]
pub struct JobLock {
    file: File,
}

impl JobLock {
    /// Acquire the lock, blocking until the holder releases it.
    pub fn acquire(lock_path: &Path, job_id: &str) -> Result<Self, LockError> {
        let file = open_sentinel(lock_path)?;
        file.lock_exclusive().map_err(|e| map_contended(e, job_id))?;
        Ok(Self { file })
    }

    /// Acquire the lock without blocking; fail fast when contended.
    pub fn try_acquire(lock_path: &Path, job_id: &str) -> Result<Self, LockError> {
        let file = open_sentinel(lock_path)?;
        file.try_lock_exclusive().map_err(|e| map_contended(e, job_id))?;
        Ok(Self { file })
    }
}

impl Drop for JobLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

// Never truncate: the sentinel may be held by a running process.
fn open_sentinel(path: &Path) -> Result<File, std::io::Error> {
    OpenOptions::new().write(true).create(true).truncate(false).open(path)
}

fn map_contended(err: std::io::Error, job_id: &str) -> LockError {
    if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
        LockError::Contended(job_id.to_string())
    } else {
        LockError::Io(err)
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
