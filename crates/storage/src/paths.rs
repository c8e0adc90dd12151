//! On-disk layout of a single job directory.

use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "state.json";
pub const LOCK_FILE: &str = "state.lock";

/// Paths within `<jobs_dir>/<job_id>/`.
#[derive(Debug, Clone)]
pub struct JobPaths {
    root: PathBuf,
}

impl JobPaths {
    pub fn new(jobs_dir: &Path, job_id: &str) -> Self {
        Self { root: jobs_dir.join(job_id) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// NDJSON files produced by the import step.
    pub fn import_dir(&self) -> PathBuf {
        self.root.join("import")
    }

    /// NDJSON files produced by the DIMP step.
    pub fn pseudonymized_dir(&self) -> PathBuf {
        self.root.join("pseudonymized")
    }

    pub fn csv_dir(&self) -> PathBuf {
        self.root.join("csv")
    }

    pub fn parquet_dir(&self) -> PathBuf {
        self.root.join("parquet")
    }

    /// All step output directories, created at job creation.
    pub fn step_dirs(&self) -> [PathBuf; 4] {
        [
            self.import_dir(),
            self.pseudonymized_dir(),
            self.csv_dir(),
            self.parquet_dir(),
        ]
    }
}
