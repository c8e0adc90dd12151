//! DIMP step: pseudonymize every imported resource, splitting oversized
//! Bundles so each HTTP payload stays under the configured threshold.

use super::{ndjson_files, StepContext};
use crate::progress::Progress;
use aether_adapters::DimpService;
use aether_core::{
    backoff, bundle, should_retry, Clock, ErrorRecord, OversizedResource, SplitDecision,
    StepReport,
};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

pub(crate) async fn run<T, D, V, F, C>(
    ctx: &mut StepContext<'_, T, D, V, F, C>,
) -> Result<StepReport, ErrorRecord>
where
    D: DimpService,
    C: Clock,
{
    let dimp_config = ctx.job.config.services.dimp.clone();
    let retry = ctx.job.config.retry.clone();
    let threshold = dimp_config.split_threshold_bytes();

    let files = ndjson_files(&ctx.paths.import_dir(), ctx.clock.now_utc())?;
    let mut report = StepReport::default();
    let mut oversized: Vec<OversizedResource> = Vec::new();

    for path in files {
        let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
        let bytes = pseudonymize_file(ctx, &path, &dimp_config, &retry, threshold, &mut oversized).await?;
        report.files += 1;
        report.bytes += bytes;
        ctx.progress.file_completed(&name, bytes);
    }

    if !oversized.is_empty() {
        report_oversized(ctx.progress, &oversized);
    }
    // Carried on the step record so a later status query can render it.
    report.oversized = oversized;
    Ok(report)
}

async fn pseudonymize_file<T, D, V, F, C>(
    ctx: &StepContext<'_, T, D, V, F, C>,
    path: &Path,
    dimp_config: &aether_core::DimpConfig,
    retry: &aether_core::RetryConfig,
    threshold: usize,
    oversized: &mut Vec<OversizedResource>,
) -> Result<u64, ErrorRecord>
where
    D: DimpService,
    C: Clock,
{
    let at = ctx.clock.now_utc();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ErrorRecord::transient(format!("cannot read {}: {e}", path.display()), at))?;

    let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
    let dest = ctx.paths.pseudonymized_dir().join(&name);
    let mut out = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let resource: Value = serde_json::from_str(line).map_err(|e| {
            ErrorRecord::permanent(
                format!("malformed NDJSON in {} line {}: {e}", path.display(), line_no + 1),
                ctx.clock.now_utc(),
            )
        })?;

        let decision = bundle::split_decision(&resource, threshold).map_err(|e| {
            ErrorRecord::permanent(format!("cannot size resource: {e}"), ctx.clock.now_utc())
        })?;
        let pseudonymized = match decision {
            SplitDecision::SendDirect => {
                ctx.services.dimp.de_identify(dimp_config, &resource).await?
            }
            SplitDecision::SkipOversized(report) => {
                oversized.push(report);
                continue;
            }
            SplitDecision::Split => {
                split_and_process(ctx, dimp_config, retry, threshold, &resource).await?
            }
        };

        serde_json::to_writer(&mut out, &pseudonymized).map_err(|e| {
            ErrorRecord::permanent(format!("cannot serialize resource: {e}"), ctx.clock.now_utc())
        })?;
        out.push(b'\n');
    }

    std::fs::write(&dest, &out).map_err(|e| {
        ErrorRecord::transient(format!("cannot write {}: {e}", dest.display()), ctx.clock.now_utc())
    })?;
    Ok(out.len() as u64)
}

/// Split an oversized Bundle, submit the chunks sequentially, reassemble.
///
/// Chunks retry independently: a transient chunk failure does not restart
/// the Bundle. Order is preserved by processing sequentially.
async fn split_and_process<T, D, V, F, C>(
    ctx: &StepContext<'_, T, D, V, F, C>,
    dimp_config: &aether_core::DimpConfig,
    retry: &aether_core::RetryConfig,
    threshold: usize,
    original: &Value,
) -> Result<Value, ErrorRecord>
where
    D: DimpService,
    C: Clock,
{
    let chunks = bundle::split_bundle(original, threshold).map_err(|e| {
        ErrorRecord::permanent(format!("cannot split Bundle: {e}"), ctx.clock.now_utc())
    })?;
    info!(
        bundle_id = original.get("id").and_then(|v| v.as_str()).unwrap_or(""),
        chunks = chunks.len(),
        "splitting oversized Bundle"
    );

    let mut processed = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        processed.push(de_identify_chunk(ctx, dimp_config, retry, chunk, index).await?);
        ctx.progress.message(&format!("pseudonymized chunk {}/{}", index + 1, chunks.len()));
    }

    bundle::reassemble(original, &processed).map_err(|e| {
        ErrorRecord::permanent(format!("cannot reassemble Bundle: {e}"), ctx.clock.now_utc())
    })
}

async fn de_identify_chunk<T, D, V, F, C>(
    ctx: &StepContext<'_, T, D, V, F, C>,
    dimp_config: &aether_core::DimpConfig,
    retry: &aether_core::RetryConfig,
    chunk: &Value,
    index: usize,
) -> Result<Value, ErrorRecord>
where
    D: DimpService,
    C: Clock,
{
    let mut attempts = 0u32;
    loop {
        match ctx.services.dimp.de_identify(dimp_config, chunk).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !should_retry(&err, attempts, retry.max_attempts) {
                    return Err(err);
                }
                let delay = backoff(attempts, retry.initial_backoff_ms, retry.max_backoff_ms);
                attempts += 1;
                info!(chunk = index, attempt = attempts, error = %err, "retrying chunk after backoff");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn report_oversized(progress: &dyn Progress, oversized: &[OversizedResource]) {
    progress.message(&format!(
        "{} oversized resource(s) skipped; see log for details",
        oversized.len()
    ));
    for report in oversized {
        warn!(
            resource_type = %report.resource_type,
            id = %report.id,
            size = report.size,
            threshold = report.threshold,
            guidance = report.guidance(),
            "skipped oversized resource"
        );
    }
}

#[cfg(test)]
#[path = "dimp_tests.rs"]
mod tests;
