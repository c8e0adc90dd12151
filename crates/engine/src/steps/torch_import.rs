//! TORCH import: submit a CRTDL, poll the extraction, download results.
//!
//! Two entry modes share this worker: a CRTDL file input submits first; a
//! TORCH result URL (or a persisted Content-Location from a previous run)
//! skips submission and polls directly.

use super::{count_records, file_name_for_url, StepContext};
use aether_adapters::{PollOutcome, TorchService};
use aether_core::{Clock, ErrorRecord, StepReport};
use futures_util::stream::{self, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Concurrent result-file downloads.
const DOWNLOAD_CONCURRENCY: usize = 4;

pub(crate) async fn run<T, D, V, F, C>(
    ctx: &mut StepContext<'_, T, D, V, F, C>,
) -> Result<StepReport, ErrorRecord>
where
    T: TorchService,
    C: Clock,
{
    let torch_config = ctx.job.config.services.torch.clone();

    let extraction_url = match &ctx.job.torch_extraction_url {
        Some(url) => url.clone(),
        None => {
            let at = ctx.clock.now_utc();
            let crtdl = std::fs::read(&ctx.job.input_source).map_err(|e| {
                ErrorRecord::permanent(
                    format!("cannot read CRTDL file {}: {e}", ctx.job.input_source),
                    at,
                )
            })?;
            let url = ctx.services.torch.submit(&torch_config, &crtdl).await?;
            info!(extraction_url = %url, "TORCH accepted extraction");
            // Persist before polling so a crashed process can resume the
            // poll loop without resubmitting.
            ctx.job.set_torch_extraction_url(url.as_str(), ctx.clock.now_utc());
            ctx.store.save(ctx.job).map_err(|e| {
                ErrorRecord::transient(format!("failed to persist extraction url: {e}"), ctx.clock.now_utc())
            })?;
            url
        }
    };

    let file_urls = poll_until_complete(ctx, &torch_config, &extraction_url).await?;
    if file_urls.is_empty() {
        // An empty cohort is a valid result; downstream steps see no files.
        ctx.progress.message("extraction complete: no result files");
        return Ok(StepReport::default());
    }

    ctx.progress.message(&format!("extraction complete: {} result files", file_urls.len()));
    download_all(ctx, &torch_config, file_urls).await
}

async fn poll_until_complete<T, D, V, F, C>(
    ctx: &StepContext<'_, T, D, V, F, C>,
    torch_config: &aether_core::TorchConfig,
    extraction_url: &str,
) -> Result<Vec<String>, ErrorRecord>
where
    T: TorchService,
    C: Clock,
{
    let started = ctx.clock.now();
    let deadline = Duration::from_secs(torch_config.extraction_timeout_minutes * 60);
    let max_interval = Duration::from_secs(torch_config.max_polling_interval_seconds);
    let mut interval = Duration::from_secs(torch_config.polling_interval_seconds);

    loop {
        match ctx.services.torch.poll(torch_config, extraction_url).await? {
            PollOutcome::Complete(urls) => return Ok(urls),
            PollOutcome::InProgress => {
                if ctx.clock.now().duration_since(started) >= deadline {
                    // Transient: the step can be re-run against the same URL.
                    return Err(ErrorRecord::transient(
                        format!(
                            "TORCH extraction timed out after {} minutes",
                            torch_config.extraction_timeout_minutes
                        ),
                        ctx.clock.now_utc(),
                    ));
                }
                tokio::time::sleep(interval).await;
                interval = (interval * 2).min(max_interval);
            }
        }
    }
}

async fn download_all<T, D, V, F, C>(
    ctx: &StepContext<'_, T, D, V, F, C>,
    torch_config: &aether_core::TorchConfig,
    file_urls: Vec<String>,
) -> Result<StepReport, ErrorRecord>
where
    T: TorchService,
    C: Clock,
{
    let import_dir = ctx.paths.import_dir();
    let targets: Vec<(String, PathBuf)> = file_urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            let mut name = file_name_for_url(url);
            // Distinct URLs can share a file name; disambiguate by position.
            if file_urls.iter().filter(|u| file_name_for_url(u) == name).count() > 1 {
                name = format!("{i:04}-{name}");
            }
            (url.clone(), import_dir.join(name))
        })
        .collect();

    let results: Vec<Result<u64, ErrorRecord>> = stream::iter(targets.iter())
        .map(|(url, dest)| async move {
            ctx.services.torch.download(torch_config, url, dest).await
        })
        .buffered(DOWNLOAD_CONCURRENCY)
        .collect()
        .await;

    let mut report = StepReport::default();
    for (result, (_, dest)) in results.into_iter().zip(&targets) {
        let bytes = result?;
        report.files += 1;
        report.bytes += bytes;
        let name = dest.file_name().unwrap_or_default().to_string_lossy();
        info!(file = %name, records = count_records(dest), "downloaded extraction result");
        ctx.progress.file_completed(&name, bytes);
    }
    Ok(report)
}

#[cfg(test)]
#[path = "torch_import_tests.rs"]
mod tests;
