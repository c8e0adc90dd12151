//! HTTP import: download NDJSON from a URL, following directory listings.

use super::{count_records, file_name_for_url, StepContext};
use aether_adapters::{extract_ndjson_links, Fetched, Fetcher};
use aether_core::{Clock, ErrorRecord, StepReport};
use tracing::debug;

pub(crate) async fn run<T, D, V, F, C>(
    ctx: &mut StepContext<'_, T, D, V, F, C>,
) -> Result<StepReport, ErrorRecord>
where
    F: Fetcher,
    C: Clock,
{
    let url = ctx.job.input_source.clone();
    let dest = ctx.paths.import_dir().join(file_name_for_url(&url));

    let mut report = StepReport::default();
    match ctx.services.fetcher.fetch(&url, &dest).await? {
        Fetched::File { bytes } => {
            report.files = 1;
            report.bytes = bytes;
            debug!(%url, records = count_records(&dest), "downloaded NDJSON file");
            ctx.progress.file_completed(&dest.file_name().unwrap_or_default().to_string_lossy(), bytes);
        }
        Fetched::Listing(html) => {
            let links = extract_ndjson_links(&url, &html);
            ctx.progress.message(&format!("directory listing with {} NDJSON files", links.len()));
            for link in links {
                let name = file_name_for_url(&link);
                let file_dest = ctx.paths.import_dir().join(&name);
                match ctx.services.fetcher.fetch(&link, &file_dest).await? {
                    Fetched::File { bytes } => {
                        report.files += 1;
                        report.bytes += bytes;
                        debug!(url = %link, records = count_records(&file_dest), "downloaded NDJSON file");
                        ctx.progress.file_completed(&name, bytes);
                    }
                    Fetched::Listing(_) => {
                        return Err(ErrorRecord::permanent(
                            format!("expected an NDJSON file at {link}, got another listing"),
                            ctx.clock.now_utc(),
                        ));
                    }
                }
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
#[path = "http_import_tests.rs"]
mod tests;
