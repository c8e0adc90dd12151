//! Validation placeholder: counts the files handed to it and completes.
//! Real FHIR profile validation is a future step behind the same seam.

use super::{ndjson_files, source_dir, StepContext};
use aether_core::{Clock, ErrorRecord, StepReport};

pub(crate) async fn run<T, D, V, F, C: Clock>(
    ctx: &mut StepContext<'_, T, D, V, F, C>,
) -> Result<StepReport, ErrorRecord> {
    let dir = source_dir(ctx.job, ctx.step_index, ctx.paths);
    let files = ndjson_files(&dir, ctx.clock.now_utc())?;

    let mut report = StepReport::default();
    for path in &files {
        let meta = std::fs::metadata(path).map_err(|e| {
            ErrorRecord::transient(format!("cannot stat {}: {e}", path.display()), ctx.clock.now_utc())
        })?;
        report.files += 1;
        report.bytes += meta.len();
    }
    ctx.progress.message(&format!("validation placeholder: {} files accepted", report.files));
    Ok(report)
}
