use super::*;
use crate::config::ProjectConfig;
use chrono::TimeZone;
use proptest::prelude::*;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn two_step_job() -> Job {
    let mut config = ProjectConfig::default();
    config.pipeline.enabled_steps = vec![StepName::LocalImport, StepName::Dimp];
    Job::new("job-1", "/data/in", InputType::LocalDir, config, at(0))
}

#[test]
fn new_job_is_pending_with_pending_steps() {
    let job = two_step_job();
    assert_eq!(job.status, Status::Pending);
    assert_eq!(job.schema_version, SCHEMA_VERSION);
    assert_eq!(job.steps.len(), 2);
    assert!(job.steps.iter().all(|s| s.status == Status::Pending));
    assert!(job.steps.iter().all(|s| s.started_at.is_none()));
    assert_eq!(job.current_step, "");
    assert_eq!(job.created_at, job.updated_at);
}

#[test]
fn step_name_round_trips_through_from_str() {
    for name in StepName::ALL {
        let parsed: StepName = name.to_string().parse().unwrap();
        assert_eq!(parsed, name);
    }
    assert_eq!("dimp".parse::<StepName>().unwrap(), StepName::Dimp);
    assert!("SHRED".parse::<StepName>().is_err());
}

#[yare::parameterized(
    local = { InputType::LocalDir, StepName::LocalImport },
    http  = { InputType::HttpUrl, StepName::HttpImport },
    crtdl = { InputType::CrtdlFile, StepName::TorchImport },
    torch = { InputType::TorchUrl, StepName::TorchImport },
)]
fn input_type_maps_to_import_step(input_type: InputType, expected: StepName) {
    assert_eq!(StepName::for_input(input_type), expected);
    assert!(expected.is_import());
}

#[test]
fn start_step_sets_in_progress_and_current_step() {
    let mut job = two_step_job();
    job.start_step(0, at(5));

    assert_eq!(job.status, Status::InProgress);
    assert_eq!(job.current_step, "LOCAL_IMPORT");
    assert_eq!(job.steps[0].status, Status::InProgress);
    assert_eq!(job.steps[0].started_at, Some(at(5)));
    assert_eq!(job.updated_at, at(5));
}

#[test]
fn completing_all_steps_completes_the_job() {
    let mut job = two_step_job();
    job.start_step(0, at(1));
    job.complete_step(0, StepReport { files: 2, bytes: 100, ..Default::default() }, at(2));
    assert_eq!(job.status, Status::InProgress);
    assert_eq!(job.next_step(), Some(1));

    job.start_step(1, at(3));
    job.complete_step(1, StepReport { files: 2, bytes: 100, ..Default::default() }, at(4));
    assert_eq!(job.status, Status::Completed);
    assert!(job.is_terminal());
    assert_eq!(job.current_step, "");
    assert_eq!(job.next_step(), None);
}

#[test]
fn only_import_steps_feed_job_totals() {
    let mut job = two_step_job();
    job.start_step(0, at(1));
    job.complete_step(0, StepReport { files: 2, bytes: 100, ..Default::default() }, at(2));
    job.start_step(1, at(3));
    job.complete_step(1, StepReport { files: 2, bytes: 90, ..Default::default() }, at(4));

    assert_eq!(job.total_files, 2);
    assert_eq!(job.total_bytes, 100);
}

#[test]
fn complete_step_persists_oversized_reports() {
    use crate::bundle::OversizedResource;

    let mut job = two_step_job();
    job.start_step(0, at(1));
    job.complete_step(0, StepReport::default(), at(2));
    job.start_step(1, at(3));
    let report = StepReport {
        files: 1,
        bytes: 10,
        oversized: vec![OversizedResource {
            resource_type: "DocumentReference".into(),
            id: "doc-1".into(),
            size: 2_097_152,
            threshold: 1_048_576,
        }],
    };
    job.complete_step(1, report, at(4));

    assert_eq!(job.steps[1].oversized.len(), 1);
    assert_eq!(job.steps[1].oversized[0].id, "doc-1");

    // The summary survives a save/load cycle.
    let json = serde_json::to_string(&job).unwrap();
    let parsed: Job = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.steps[1].oversized, job.steps[1].oversized);
}

#[test]
fn fail_step_fails_the_job_with_summary() {
    let mut job = two_step_job();
    job.start_step(0, at(1));
    let err = ErrorRecord::permanent("malformed NDJSON in patients.ndjson", at(2));
    job.fail_step(0, err, at(2));

    assert_eq!(job.status, Status::Failed);
    assert!(job.is_terminal());
    assert_eq!(job.current_step, "");
    assert_eq!(job.steps[0].status, Status::Failed);
    assert!(job.steps[0].last_error.is_some());
    let msg = job.error_message.as_deref().unwrap();
    assert!(msg.contains("LOCAL_IMPORT"));
    assert!(msg.contains("malformed NDJSON"));
}

#[test]
fn reopen_failed_step_keeps_retry_count() {
    let mut job = two_step_job();
    job.start_step(0, at(1));
    job.record_retry(0, ErrorRecord::transient("timeout", at(2)), at(2));
    job.record_retry(0, ErrorRecord::transient("timeout", at(3)), at(3));
    job.fail_step(0, ErrorRecord::transient("timeout", at(4)), at(4));

    job.reopen_step(0, at(5));
    assert_eq!(job.status, Status::InProgress);
    assert_eq!(job.steps[0].status, Status::Pending);
    assert!(job.steps[0].started_at.is_none());
    assert_eq!(job.steps[0].retry_count, 2);
    assert!(job.error_message.is_none());
}

#[test]
fn successful_completion_keeps_retry_count_and_clears_error() {
    let mut job = two_step_job();
    job.start_step(0, at(1));
    job.record_retry(0, ErrorRecord::transient("blip", at(2)), at(2));
    job.complete_step(0, StepReport::default(), at(3));

    assert_eq!(job.steps[0].retry_count, 1);
    assert!(job.steps[0].last_error.is_none());
}

#[test]
fn updated_at_is_monotonic() {
    let mut job = two_step_job();
    job.start_step(0, at(10));
    // A transition stamped with an earlier clock reading must not move time backwards.
    job.record_retry(0, ErrorRecord::transient("clock skew", at(3)), at(3));
    assert_eq!(job.updated_at, at(10));
}

#[test]
fn prerequisites_gate_later_steps() {
    let mut job = two_step_job();
    assert!(job.prerequisites_met(0));
    assert!(!job.prerequisites_met(1));

    job.start_step(0, at(1));
    job.complete_step(0, StepReport::default(), at(2));
    assert!(job.prerequisites_met(1));
}

#[test]
fn torch_extraction_url_persists_on_the_job() {
    let mut job = two_step_job();
    job.set_torch_extraction_url("http://torch.example/fhir/__status/abc", at(7));
    assert_eq!(
        job.torch_extraction_url.as_deref(),
        Some("http://torch.example/fhir/__status/abc")
    );
    assert_eq!(job.updated_at, at(7));
}

#[test]
fn serde_round_trip_preserves_job() {
    let mut job = two_step_job();
    job.start_step(0, at(1));
    job.record_retry(0, ErrorRecord::from_http_status(503, "unavailable", at(2)), at(2));

    let json = serde_json::to_string(&job).unwrap();
    let parsed: Job = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, job);
}

#[test]
fn unknown_fields_are_ignored_on_load() {
    let job = two_step_job();
    let mut value = serde_json::to_value(&job).unwrap();
    value["future_field"] = serde_json::json!({"nested": true});
    let parsed: Job = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, job);
}

#[test]
fn saving_twice_yields_identical_bytes() {
    let job = two_step_job();
    let a = serde_json::to_vec(&job).unwrap();
    let b = serde_json::to_vec(&job).unwrap();
    assert_eq!(a, b);
}

#[test]
fn builder_produces_consistent_defaults() {
    let job = Job::builder().job_id("custom-id").status(Status::InProgress).build();
    assert_eq!(job.job_id, "custom-id");
    assert_eq!(job.status, Status::InProgress);
    assert_eq!(job.steps.len(), 1);
    assert_eq!(job.created_at, job.updated_at);
}

proptest! {
    // Random walks through the transition API: persisted state only ever
    // moves forward, and the terminal-status equivalences hold throughout.
    #[test]
    fn transition_sequences_keep_invariants(ops in proptest::collection::vec(0u8..4, 0..24)) {
        let mut job = two_step_job();
        let mut last_updated = job.updated_at;

        for (tick, op) in ops.into_iter().enumerate() {
            let now = at(tick as i64 + 1);
            match op {
                0 => {
                    if let Some(i) = job.next_step() {
                        if job.prerequisites_met(i) && job.steps[i].status != Status::Failed {
                            job.start_step(i, now);
                        }
                    }
                }
                1 => {
                    if let Some(i) = job.next_step() {
                        if job.steps[i].status == Status::InProgress {
                            job.complete_step(i, StepReport::default(), now);
                        }
                    }
                }
                2 => {
                    if let Some(i) = job.next_step() {
                        if job.steps[i].status == Status::InProgress {
                            job.fail_step(i, ErrorRecord::transient("flaky", now), now);
                        }
                    }
                }
                _ => {
                    if let Some(i) = job.steps.iter().position(|s| s.status == Status::Failed) {
                        job.reopen_step(i, now);
                    }
                }
            }

            prop_assert!(job.updated_at >= last_updated);
            last_updated = job.updated_at;

            prop_assert_eq!(
                job.status == Status::Completed,
                job.steps.iter().all(|s| s.status == Status::Completed)
            );
            if job.status == Status::Failed {
                let failed = job.steps.iter().find(|s| s.status == Status::Failed);
                prop_assert!(failed.is_some_and(|s| s.last_error.is_some()));
                prop_assert!(job.error_message.is_some());
            }
            for step in &job.steps {
                match step.status {
                    Status::Pending => prop_assert!(step.started_at.is_none()),
                    Status::InProgress => prop_assert!(step.started_at.is_some()),
                    Status::Completed => prop_assert!(step.started_at.is_some() && step.completed_at.is_some()),
                    Status::Failed => prop_assert!(step.started_at.is_some() && step.last_error.is_some()),
                }
            }
        }
    }
}
