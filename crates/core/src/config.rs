//! Project configuration, snapshotted into each job at creation.

use crate::job::StepName;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_enabled_steps() -> Vec<StepName> {
    vec![StepName::LocalImport]
}

fn default_split_threshold_mb() -> u64 {
    10
}

fn default_extraction_timeout_minutes() -> u64 {
    30
}

fn default_polling_interval_seconds() -> u64 {
    5
}

fn default_max_polling_interval_seconds() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_http_timeout_seconds() -> u64 {
    30
}

fn default_jobs_dir() -> PathBuf {
    PathBuf::from("./jobs")
}

/// Step sequence configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ordered list of enabled steps; defines the execution sequence.
    #[serde(default = "default_enabled_steps")]
    pub enabled_steps: Vec<StepName>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { enabled_steps: default_enabled_steps() }
    }
}

/// DIMP pseudonymization service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Bundles serializing above this many MiB are split before submission.
    #[serde(default = "default_split_threshold_mb")]
    pub bundle_split_threshold_mb: u64,
}

impl Default for DimpConfig {
    fn default() -> Self {
        Self { url: None, bundle_split_threshold_mb: default_split_threshold_mb() }
    }
}

impl DimpConfig {
    pub fn split_threshold_bytes(&self) -> usize {
        (self.bundle_split_threshold_mb as usize).saturating_mul(1_048_576)
    }
}

/// TORCH extraction service and its polling cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_extraction_timeout_minutes")]
    pub extraction_timeout_minutes: u64,
    #[serde(default = "default_polling_interval_seconds")]
    pub polling_interval_seconds: u64,
    #[serde(default = "default_max_polling_interval_seconds")]
    pub max_polling_interval_seconds: u64,
}

impl Default for TorchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: String::new(),
            password: String::new(),
            extraction_timeout_minutes: default_extraction_timeout_minutes(),
            polling_interval_seconds: default_polling_interval_seconds(),
            max_polling_interval_seconds: default_max_polling_interval_seconds(),
        }
    }
}

/// External service endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub dimp: DimpConfig,
    #[serde(default)]
    pub torch: TorchConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_conversion_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parquet_conversion_url: Option<String>,
    /// Bound on every outbound HTTP request.
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            dimp: DimpConfig::default(),
            torch: TorchConfig::default(),
            csv_conversion_url: None,
            parquet_conversion_url: None,
            http_timeout_seconds: default_http_timeout_seconds(),
        }
    }
}

/// Retry budget and backoff bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// The whole recognized option tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_jobs_dir")]
    pub jobs_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            services: ServicesConfig::default(),
            retry: RetryConfig::default(),
            jobs_dir: default_jobs_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("pipeline.enabled_steps must name at least one step")]
    NoStepsEnabled,
    #[error("first enabled step must be an import step, got {0}")]
    FirstStepNotImport(StepName),
    #[error("step {0} enabled more than once")]
    DuplicateStep(StepName),
    #[error("services.dimp.bundle_split_threshold_mb must be 1-100, got {0}")]
    SplitThresholdOutOfRange(u64),
    #[error("retry.max_attempts must be 1-10, got {0}")]
    MaxAttemptsOutOfRange(u32),
    #[error("retry.initial_backoff_ms must be positive")]
    ZeroInitialBackoff,
    #[error("retry.max_backoff_ms ({max}) must be >= retry.initial_backoff_ms ({initial})")]
    BackoffBoundsInverted { initial: u64, max: u64 },
    #[error("services.torch.polling_interval_seconds must be 1-60, got {0}")]
    PollingIntervalOutOfRange(u64),
    #[error("services.torch.max_polling_interval_seconds ({max}) must be >= polling_interval_seconds ({interval})")]
    MaxPollingBelowInterval { interval: u64, max: u64 },
    #[error("step {step} is enabled but {option} is not configured")]
    MissingServiceUrl { step: StepName, option: &'static str },
    #[error("jobs_dir must not be empty")]
    EmptyJobsDir,
}

/// Accepted-but-suspicious settings surfaced at job creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Thresholds above 50 MiB approach common HTTP server body limits.
    LargeSplitThreshold(u64),
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::LargeSplitThreshold(mb) => write!(
                f,
                "bundle_split_threshold_mb = {mb} is above 50; DIMP may reject payloads this large"
            ),
        }
    }
}

impl ProjectConfig {
    /// Validate the option tree. Returns accepted warnings on success.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let steps = &self.pipeline.enabled_steps;
        let first = *steps.first().ok_or(ConfigError::NoStepsEnabled)?;
        if !first.is_import() {
            return Err(ConfigError::FirstStepNotImport(first));
        }
        for (i, step) in steps.iter().enumerate() {
            if steps[..i].contains(step) {
                return Err(ConfigError::DuplicateStep(*step));
            }
        }

        for step in steps {
            let missing = match step {
                StepName::Dimp if self.services.dimp.url.is_none() => Some("services.dimp.url"),
                StepName::TorchImport if self.services.torch.base_url.is_none() => {
                    Some("services.torch.base_url")
                }
                StepName::CsvConversion if self.services.csv_conversion_url.is_none() => {
                    Some("services.csv_conversion_url")
                }
                StepName::ParquetConversion if self.services.parquet_conversion_url.is_none() => {
                    Some("services.parquet_conversion_url")
                }
                _ => None,
            };
            if let Some(option) = missing {
                return Err(ConfigError::MissingServiceUrl { step: *step, option });
            }
        }

        let threshold = self.services.dimp.bundle_split_threshold_mb;
        if !(1..=100).contains(&threshold) {
            return Err(ConfigError::SplitThresholdOutOfRange(threshold));
        }

        if !(1..=10).contains(&self.retry.max_attempts) {
            return Err(ConfigError::MaxAttemptsOutOfRange(self.retry.max_attempts));
        }
        if self.retry.initial_backoff_ms == 0 {
            return Err(ConfigError::ZeroInitialBackoff);
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::BackoffBoundsInverted {
                initial: self.retry.initial_backoff_ms,
                max: self.retry.max_backoff_ms,
            });
        }

        let torch = &self.services.torch;
        if !(1..=60).contains(&torch.polling_interval_seconds) {
            return Err(ConfigError::PollingIntervalOutOfRange(torch.polling_interval_seconds));
        }
        if torch.max_polling_interval_seconds < torch.polling_interval_seconds {
            return Err(ConfigError::MaxPollingBelowInterval {
                interval: torch.polling_interval_seconds,
                max: torch.max_polling_interval_seconds,
            });
        }

        if self.jobs_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyJobsDir);
        }

        let mut warnings = Vec::new();
        if threshold > 50 {
            warnings.push(ConfigWarning::LargeSplitThreshold(threshold));
        }
        Ok(warnings)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
