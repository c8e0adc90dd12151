//! Job and step state machine.

use crate::bundle::OversizedResource;
use crate::config::ProjectConfig;
use crate::error::ErrorRecord;
use crate::input::InputType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema of `state.json`. Written on save; unknown fields from
/// newer schemas are ignored on load.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Status of a job or of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

crate::simple_display! {
    Status {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Failed => "FAILED",
    }
}

/// Name of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepName {
    LocalImport,
    HttpImport,
    TorchImport,
    Dimp,
    Validation,
    CsvConversion,
    ParquetConversion,
}

crate::simple_display! {
    StepName {
        LocalImport => "LOCAL_IMPORT",
        HttpImport => "HTTP_IMPORT",
        TorchImport => "TORCH_IMPORT",
        Dimp => "DIMP",
        Validation => "VALIDATION",
        CsvConversion => "CSV_CONVERSION",
        ParquetConversion => "PARQUET_CONVERSION",
    }
}

impl StepName {
    pub const ALL: [StepName; 7] = [
        StepName::LocalImport,
        StepName::HttpImport,
        StepName::TorchImport,
        StepName::Dimp,
        StepName::Validation,
        StepName::CsvConversion,
        StepName::ParquetConversion,
    ];

    /// Import-class steps are the only valid first step of a pipeline.
    pub fn is_import(self) -> bool {
        matches!(
            self,
            StepName::LocalImport | StepName::HttpImport | StepName::TorchImport
        )
    }

    /// The import step an input type maps to.
    pub fn for_input(input_type: InputType) -> StepName {
        match input_type {
            InputType::LocalDir => StepName::LocalImport,
            InputType::HttpUrl => StepName::HttpImport,
            InputType::CrtdlFile | InputType::TorchUrl => StepName::TorchImport,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown step name: {0}")]
pub struct UnknownStep(pub String);

impl std::str::FromStr for StepName {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepName::ALL
            .iter()
            .find(|name| name.to_string().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}

/// A stage within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: StepName,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files_processed: u64,
    #[serde(default)]
    pub bytes_processed: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorRecord>,
    /// Resources skipped for exceeding the DIMP payload threshold; kept on
    /// the step so a later status query can still render the summary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub oversized: Vec<OversizedResource>,
}

impl Step {
    pub fn pending(name: StepName) -> Self {
        Self {
            name,
            status: Status::Pending,
            started_at: None,
            completed_at: None,
            files_processed: 0,
            bytes_processed: 0,
            retry_count: 0,
            last_error: None,
            oversized: Vec::new(),
        }
    }

    fn start(&mut self, at: DateTime<Utc>) {
        self.status = Status::InProgress;
        self.started_at = Some(at);
        self.completed_at = None;
    }

    // retry_count survives completion: it records what this execution
    // consumed. The executor grants a fresh budget per execution.
    fn complete(&mut self, at: DateTime<Utc>, report: StepReport) {
        self.status = Status::Completed;
        self.completed_at = Some(at);
        self.files_processed = report.files;
        self.bytes_processed = report.bytes;
        self.oversized = report.oversized;
        self.last_error = None;
    }

    fn fail(&mut self, error: ErrorRecord) {
        self.status = Status::Failed;
        self.last_error = Some(error);
    }
}

/// What a step worker reports on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub files: u64,
    pub bytes: u64,
    /// Non-Bundle resources skipped for exceeding the DIMP threshold.
    pub oversized: Vec<OversizedResource>,
}

/// The root aggregate: one durable pipeline run.
///
/// Mutation happens only through the transition methods below; every
/// transition bumps `updated_at` monotonically. The embedded `config` is
/// the snapshot taken at creation and is never re-read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub job_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub input_source: String,
    pub input_type: InputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torch_extraction_url: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub current_step: String,
    pub steps: Vec<Step>,
    pub config: ProjectConfig,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    /// Build a fresh PENDING job with one PENDING step per enabled step.
    pub fn new(
        job_id: impl Into<String>,
        input_source: impl Into<String>,
        input_type: InputType,
        config: ProjectConfig,
        created_at: DateTime<Utc>,
    ) -> Self {
        let steps = config
            .pipeline
            .enabled_steps
            .iter()
            .map(|name| Step::pending(*name))
            .collect();
        Self {
            schema_version: SCHEMA_VERSION,
            job_id: job_id.into(),
            created_at,
            updated_at: created_at,
            input_source: input_source.into(),
            input_type,
            torch_extraction_url: None,
            status: Status::Pending,
            current_step: String::new(),
            steps,
            config,
            total_files: 0,
            total_bytes: 0,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn step_index(&self, name: StepName) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// Index of the first step that is not COMPLETED, if any.
    pub fn next_step(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status != Status::Completed)
    }

    /// True when every step before `index` is COMPLETED.
    pub fn prerequisites_met(&self, index: usize) -> bool {
        self.steps[..index].iter().all(|s| s.status == Status::Completed)
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = self.updated_at.max(at);
    }

    /// Transition step `index` to IN_PROGRESS.
    pub fn start_step(&mut self, index: usize, at: DateTime<Utc>) {
        self.status = Status::InProgress;
        self.error_message = None;
        self.current_step = self.steps[index].name.to_string();
        self.steps[index].start(at);
        self.touch(at);
    }

    /// Record a consumed retry attempt on step `index`.
    pub fn record_retry(&mut self, index: usize, error: ErrorRecord, at: DateTime<Utc>) {
        self.steps[index].retry_count += 1;
        self.steps[index].last_error = Some(error);
        self.touch(at);
    }

    /// Transition step `index` to COMPLETED with its report.
    ///
    /// Import-class steps feed the job-level aggregate counters; later
    /// steps reshape data already accounted for.
    pub fn complete_step(&mut self, index: usize, report: StepReport, at: DateTime<Utc>) {
        let name = self.steps[index].name;
        let (files, bytes) = (report.files, report.bytes);
        self.steps[index].complete(at, report);
        if name.is_import() {
            self.total_files += files;
            self.total_bytes += bytes;
        }
        if self.steps.iter().all(|s| s.status == Status::Completed) {
            self.status = Status::Completed;
            self.current_step = String::new();
        }
        self.touch(at);
    }

    /// Transition step `index` and the whole job to FAILED.
    pub fn fail_step(&mut self, index: usize, error: ErrorRecord, at: DateTime<Utc>) {
        let summary = format!("step {} failed: {}", self.steps[index].name, error);
        self.steps[index].fail(error);
        self.status = Status::Failed;
        self.current_step = String::new();
        self.error_message = Some(summary);
        self.touch(at);
    }

    /// Mark the job COMPLETED when every step already is. Returns whether
    /// anything changed. Covers resume paths that find no remaining work.
    pub fn refresh_completion(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != Status::Completed
            && self.steps.iter().all(|s| s.status == Status::Completed)
        {
            self.status = Status::Completed;
            self.current_step = String::new();
            self.touch(at);
            return true;
        }
        false
    }

    /// Re-open a FAILED step for an explicit resume, restoring the PENDING
    /// shape (no timestamps).
    ///
    /// `retry_count` and `last_error` carry over (informational); the
    /// executor grants a fresh attempt budget for the new execution.
    pub fn reopen_step(&mut self, index: usize, at: DateTime<Utc>) {
        let step = &mut self.steps[index];
        step.status = Status::Pending;
        step.started_at = None;
        step.completed_at = None;
        self.status = Status::InProgress;
        self.error_message = None;
        self.touch(at);
    }

    /// Persist the TORCH Content-Location so a resumed process can skip
    /// submission and go straight to polling.
    pub fn set_torch_extraction_url(&mut self, url: impl Into<String>, at: DateTime<Utc>) {
        self.torch_extraction_url = Some(url.into());
        self.touch(at);
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            job_id: String = "00000000-0000-4000-8000-000000000000",
            input_source: String = "/data/in",
            current_step: String = "",
        }
        set {
            schema_version: u32 = SCHEMA_VERSION,
            input_type: InputType = InputType::LocalDir,
            status: Status = Status::Pending,
            steps: Vec<Step> = vec![Step::pending(StepName::LocalImport)],
            config: ProjectConfig = ProjectConfig::default(),
            total_files: u64 = 0,
            total_bytes: u64 = 0,
        }
        option {
            torch_extraction_url: String = None,
            error_message: String = None,
        }
        computed {
            created_at: DateTime<Utc> = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
            updated_at: DateTime<Utc> = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
