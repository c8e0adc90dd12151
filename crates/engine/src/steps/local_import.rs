//! Local import: validate and copy NDJSON files from a source directory.

use super::{count_records, StepContext};
use aether_core::{Clock, ErrorRecord, StepReport};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub(crate) async fn run<T, D, V, F, C: Clock>(
    ctx: &mut StepContext<'_, T, D, V, F, C>,
) -> Result<StepReport, ErrorRecord> {
    let at = ctx.clock.now_utc();
    let source = PathBuf::from(&ctx.job.input_source);
    let mut files = Vec::new();
    collect_ndjson(&source, &mut files)
        .map_err(|e| ErrorRecord::transient(format!("cannot scan {}: {e}", source.display()), at))?;
    files.sort();

    let mut report = StepReport::default();
    for path in files {
        validate_ndjson(&path, at)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input.ndjson".to_string());
        let dest = ctx.paths.import_dir().join(&name);
        let bytes = std::fs::copy(&path, &dest)
            .map_err(|e| ErrorRecord::transient(format!("copy {} failed: {e}", path.display()), at))?;

        report.files += 1;
        report.bytes += bytes;
        debug!(file = %name, records = count_records(&dest), "imported NDJSON file");
        ctx.progress.file_completed(&name, bytes);
    }
    Ok(report)
}

fn collect_ndjson(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_ndjson(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("ndjson") {
            files.push(path);
        }
    }
    Ok(())
}

/// Every non-empty line must parse as JSON and carry a `resourceType`.
/// One bad line fails the whole file; the input needs fixing, not a retry.
fn validate_ndjson(path: &Path, at: chrono::DateTime<chrono::Utc>) -> Result<(), ErrorRecord> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ErrorRecord::transient(format!("cannot read {}: {e}", path.display()), at))?;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| {
            ErrorRecord::permanent(
                format!("malformed NDJSON in {} line {}: {e}", path.display(), line_no + 1),
                at,
            )
        })?;
        if value.get("resourceType").and_then(Value::as_str).is_none() {
            return Err(ErrorRecord::permanent(
                format!("malformed NDJSON in {} line {}: missing resourceType", path.display(), line_no + 1),
                at,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "local_import_tests.rs"]
mod tests;
