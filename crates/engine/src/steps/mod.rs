//! Step workers: one per pipeline stage.
//!
//! A worker gets the locked job, its paths and the injected services, does
//! its work, and returns a [`StepReport`] or an [`ErrorRecord`]. The executor owns
//! all state transitions and the retry loop.

pub(crate) mod convert;
pub(crate) mod dimp;
pub(crate) mod http_import;
pub(crate) mod local_import;
pub(crate) mod torch_import;
pub(crate) mod validation;

use crate::progress::Progress;
use crate::services::Services;
use aether_adapters::{ConvertService, DimpService, Fetcher, TorchService};
use aether_core::{Clock, ErrorRecord, Job, StepReport, StepName};
use aether_storage::{JobPaths, JobStore};
use std::path::{Path, PathBuf};

/// Everything a worker needs for one step execution.
pub(crate) struct StepContext<'a, T, D, V, F, C> {
    pub job: &'a mut Job,
    pub step_index: usize,
    pub store: &'a JobStore,
    pub paths: &'a JobPaths,
    pub services: &'a Services<T, D, V, F>,
    pub clock: &'a C,
    pub progress: &'a dyn Progress,
}

/// Dispatch to the worker for the step at `ctx.step_index`.
pub(crate) async fn run_worker<T, D, V, F, C>(
    ctx: &mut StepContext<'_, T, D, V, F, C>,
) -> Result<StepReport, ErrorRecord>
where
    T: TorchService,
    D: DimpService,
    V: ConvertService,
    F: Fetcher,
    C: Clock,
{
    match ctx.job.steps[ctx.step_index].name {
        StepName::LocalImport => local_import::run(ctx).await,
        StepName::HttpImport => http_import::run(ctx).await,
        StepName::TorchImport => torch_import::run(ctx).await,
        StepName::Dimp => dimp::run(ctx).await,
        StepName::Validation => validation::run(ctx).await,
        StepName::CsvConversion => convert::run(ctx, convert::Format::Csv).await,
        StepName::ParquetConversion => convert::run(ctx, convert::Format::Parquet).await,
    }
}

/// Directory a downstream step reads from: the DIMP output when a DIMP
/// step precedes it, otherwise the import output.
pub(crate) fn source_dir(job: &Job, step_index: usize, paths: &JobPaths) -> PathBuf {
    let pseudonymized = job.steps[..step_index].iter().any(|s| s.name == StepName::Dimp);
    if pseudonymized {
        paths.pseudonymized_dir()
    } else {
        paths.import_dir()
    }
}

/// Sorted `.ndjson` files directly under `dir`.
pub(crate) fn ndjson_files(dir: &Path, at: chrono::DateTime<chrono::Utc>) -> Result<Vec<PathBuf>, ErrorRecord> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ErrorRecord::transient(format!("cannot read {}: {e}", dir.display()), at))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| ErrorRecord::transient(format!("cannot read {}: {e}", dir.display()), at))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("ndjson") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Count newline-terminated records in a written NDJSON file. Reporting
/// only; the content is not interpreted.
pub(crate) fn count_records(path: &Path) -> u64 {
    match std::fs::read(path) {
        Ok(bytes) => bytes.iter().filter(|b| **b == b'\n').count() as u64,
        Err(_) => 0,
    }
}

/// File name for a downloaded URL: last path segment, or a fallback.
pub(crate) fn file_name_for_url(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or("");
    if name.is_empty() || !name.contains('.') {
        "download.ndjson".to_string()
    } else {
        name.to_string()
    }
}
