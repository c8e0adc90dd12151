//! Conversion steps: group NDJSON by resource type, post each group to
//! the conversion service, write one output file per type.

use super::{ndjson_files, source_dir, StepContext};
use aether_adapters::ConvertService;
use aether_core::{backoff, should_retry, Clock, ErrorRecord, StepReport};
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

/// Concurrent per-resource-type conversions.
const CONVERT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Csv,
    Parquet,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Parquet => "parquet",
        }
    }
}

pub(crate) async fn run<T, D, V, F, C>(
    ctx: &mut StepContext<'_, T, D, V, F, C>,
    format: Format,
) -> Result<StepReport, ErrorRecord>
where
    V: ConvertService,
    C: Clock,
{
    let services = &ctx.job.config.services;
    let service_url = match format {
        Format::Csv => services.csv_conversion_url.clone(),
        Format::Parquet => services.parquet_conversion_url.clone(),
    }
    .ok_or_else(|| {
        ErrorRecord::permanent("conversion service URL is not configured", ctx.clock.now_utc())
    })?;
    let retry = ctx.job.config.retry.clone();

    let out_dir = match format {
        Format::Csv => ctx.paths.csv_dir(),
        Format::Parquet => ctx.paths.parquet_dir(),
    };
    let groups = group_by_resource_type(ctx)?;
    info!(groups = groups.len(), "converting resource groups");

    // Reborrow shared so the per-group futures can all capture the context.
    let ctx = &*ctx;
    let retry_ref = &retry;
    let service_url_ref = service_url.as_str();
    let results: Vec<Result<(String, u64), ErrorRecord>> = stream::iter(groups)
        .map(|(resource_type, ndjson)| {
            let out_path = out_dir.join(format!("{resource_type}.{}", format.extension()));
            async move {
                let converted =
                    convert_group(ctx, retry_ref, service_url_ref, &resource_type, ndjson).await?;
                std::fs::write(&out_path, &converted).map_err(|e| {
                    ErrorRecord::transient(
                        format!("cannot write {}: {e}", out_path.display()),
                        ctx.clock.now_utc(),
                    )
                })?;
                Ok((resource_type, converted.len() as u64))
            }
        })
        .buffered(CONVERT_CONCURRENCY)
        .collect()
        .await;

    let mut report = StepReport::default();
    for result in results {
        let (resource_type, bytes) = result?;
        report.files += 1;
        report.bytes += bytes;
        ctx.progress.file_completed(&resource_type, bytes);
    }
    Ok(report)
}

/// Read every input file and bucket lines by `resourceType`, preserving
/// line order within each type. BTreeMap keeps output deterministic.
fn group_by_resource_type<T, D, V, F, C: Clock>(
    ctx: &StepContext<'_, T, D, V, F, C>,
) -> Result<BTreeMap<String, Vec<u8>>, ErrorRecord> {
    let dir = source_dir(ctx.job, ctx.step_index, ctx.paths);
    let mut groups: BTreeMap<String, Vec<u8>> = BTreeMap::new();

    for path in ndjson_files(&dir, ctx.clock.now_utc())? {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ErrorRecord::transient(format!("cannot read {}: {e}", path.display()), ctx.clock.now_utc())
        })?;
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| {
                ErrorRecord::permanent(
                    format!("malformed NDJSON in {} line {}: {e}", path.display(), line_no + 1),
                    ctx.clock.now_utc(),
                )
            })?;
            let resource_type = value
                .get("resourceType")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ErrorRecord::permanent(
                        format!("missing resourceType in {} line {}", path.display(), line_no + 1),
                        ctx.clock.now_utc(),
                    )
                })?
                .to_string();
            let group = groups.entry(resource_type).or_default();
            group.extend_from_slice(line.as_bytes());
            group.push(b'\n');
        }
    }
    Ok(groups)
}

/// Transient errors retry per group; other groups are unaffected.
async fn convert_group<T, D, V, F, C>(
    ctx: &StepContext<'_, T, D, V, F, C>,
    retry: &aether_core::RetryConfig,
    service_url: &str,
    resource_type: &str,
    ndjson: Vec<u8>,
) -> Result<Vec<u8>, ErrorRecord>
where
    V: ConvertService,
    C: Clock,
{
    let mut attempts = 0u32;
    loop {
        match ctx.services.convert.convert(service_url, resource_type, ndjson.clone()).await {
            Ok(converted) => return Ok(converted),
            Err(err) => {
                if !should_retry(&err, attempts, retry.max_attempts) {
                    return Err(err);
                }
                let delay = backoff(attempts, retry.initial_backoff_ms, retry.max_backoff_ms);
                attempts += 1;
                info!(resource_type, attempt = attempts, error = %err, "retrying conversion group");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
