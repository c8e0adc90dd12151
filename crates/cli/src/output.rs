//! Human-readable rendering of jobs and steps.

use aether_core::{Job, OversizedResource, Status};
use chrono::{DateTime, Utc};

pub fn print_job_summary(job: &Job) {
    println!("job:     {}", job.job_id);
    println!("input:   {} ({})", job.input_source, job.input_type);
    println!("status:  {}", job.status);
    println!("created: {}", format_time(job.created_at));
    println!("updated: {}", format_time(job.updated_at));
    if job.total_files > 0 {
        println!("imported: {} files, {}", job.total_files, format_bytes(job.total_bytes));
    }
    if let Some(url) = &job.torch_extraction_url {
        println!("extraction: {url}");
    }
    println!();
    println!(
        "  {:<20} {:<12} {:>7} {:>12} {:>7}",
        "STEP", "STATUS", "FILES", "BYTES", "RETRIES"
    );
    for step in &job.steps {
        println!(
            "  {:<20} {:<12} {:>7} {:>12} {:>7}",
            step.name.to_string(),
            step.status.to_string(),
            step.files_processed,
            format_bytes(step.bytes_processed),
            step.retry_count,
        );
        if let Some(error) = &step.last_error {
            println!("      last error: {error}");
        }
    }
    let skipped = oversized_summary(job);
    if !skipped.is_empty() {
        println!();
        println!("oversized resources skipped:");
        for line in &skipped {
            println!("{line}");
        }
    }
    if let Some(message) = &job.error_message {
        println!();
        println!("error: {message}");
    }
}

/// Table of resources the DIMP step skipped, one row per resource, with
/// the shared guidance line last. Empty when nothing was skipped.
pub fn oversized_summary(job: &Job) -> Vec<String> {
    let reports: Vec<&OversizedResource> =
        job.steps.iter().flat_map(|s| s.oversized.iter()).collect();
    let Some(first) = reports.first() else {
        return Vec::new();
    };

    let mut lines = vec![format!(
        "  {:<20} {:<24} {:>12} {:>12}",
        "TYPE", "ID", "SIZE", "THRESHOLD"
    )];
    for report in &reports {
        lines.push(format!(
            "  {:<20} {:<24} {:>12} {:>12}",
            report.resource_type,
            report.id,
            format_bytes(report.size as u64),
            format_bytes(report.threshold as u64),
        ));
    }
    lines.push(format!("  guidance: {}", first.guidance()));
    lines
}

pub fn print_job_list(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("no jobs");
        return;
    }
    println!(
        "{:<36} {:<12} {:<20} {:<19} {}",
        "JOB", "STATUS", "STEP", "CREATED", "INPUT"
    );
    for job in jobs {
        let step = match job.status {
            Status::Completed | Status::Failed => "-".to_string(),
            _ => {
                if job.current_step.is_empty() {
                    "-".to_string()
                } else {
                    job.current_step.clone()
                }
            }
        };
        println!(
            "{:<36} {:<12} {:<20} {:<19} {}",
            job.job_id,
            job.status.to_string(),
            step,
            format_time(job.created_at),
            job.input_source,
        );
    }
}

pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
