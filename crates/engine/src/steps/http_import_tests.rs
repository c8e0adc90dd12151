use crate::services::Services;
use crate::test_helpers::{config_with_steps, harness, Harness};
use aether_adapters::fakes::{FakeConvert, FakeDimp, FakeFetchResponse, FakeFetcher, FakeTorch};
use aether_core::{ErrorRecord, Status, StepName};
use chrono::Utc;

fn fetch_harness(fetcher: FakeFetcher) -> Harness {
    harness(Services::new(FakeTorch::default(), FakeDimp::echo(), FakeConvert::new(), fetcher))
}

const LINE: &str = r#"{"resourceType":"Patient","id":"p1"}"#;

#[tokio::test]
async fn downloads_a_single_ndjson_file() {
    let url = "http://files.test/export/patients.ndjson";
    let h = fetch_harness(
        FakeFetcher::new().with_response(url, FakeFetchResponse::File(format!("{LINE}\n").into_bytes())),
    );

    let (job, _) = h
        .orchestrator
        .create_job(url, config_with_steps(vec![StepName::HttpImport]))
        .unwrap();
    let done = h.orchestrator.run_job(&job.job_id).await.unwrap();

    assert_eq!(done.status, Status::Completed);
    assert_eq!(done.total_files, 1);
    let dest = h.store().paths(&job.job_id).import_dir().join("patients.ndjson");
    assert_eq!(std::fs::read_to_string(dest).unwrap(), format!("{LINE}\n"));
}

#[tokio::test]
async fn follows_directory_listings_to_ndjson_files() {
    let base = "http://files.test/export/";
    let html = r#"<a href="patients.ndjson">p</a> <a href="observations.ndjson">o</a>"#;
    let h = fetch_harness(
        FakeFetcher::new()
            .with_response(base, FakeFetchResponse::Listing(html.into()))
            .with_response(
                "http://files.test/export/patients.ndjson",
                FakeFetchResponse::File(format!("{LINE}\n").into_bytes()),
            )
            .with_response(
                "http://files.test/export/observations.ndjson",
                FakeFetchResponse::File(br#"{"resourceType":"Observation"}"#.to_vec()),
            ),
    );

    let (job, _) = h
        .orchestrator
        .create_job(base, config_with_steps(vec![StepName::HttpImport]))
        .unwrap();
    let done = h.orchestrator.run_job(&job.job_id).await.unwrap();

    assert_eq!(done.status, Status::Completed);
    assert_eq!(done.total_files, 2);
    let import = h.store().paths(&job.job_id).import_dir();
    assert!(import.join("patients.ndjson").is_file());
    assert!(import.join("observations.ndjson").is_file());
}

#[tokio::test]
async fn transient_fetch_failure_retries_the_step() {
    let url = "http://files.test/flaky.ndjson";
    let h = fetch_harness(
        FakeFetcher::new()
            .with_response(url, FakeFetchResponse::Error(ErrorRecord::transient("connection reset", Utc::now())))
            .with_response(url, FakeFetchResponse::File(format!("{LINE}\n").into_bytes())),
    );

    let (job, _) = h
        .orchestrator
        .create_job(url, config_with_steps(vec![StepName::HttpImport]))
        .unwrap();
    let done = h.orchestrator.run_job(&job.job_id).await.unwrap();

    assert_eq!(done.status, Status::Completed);
    assert_eq!(done.steps[0].retry_count, 1);
    assert_eq!(h.orchestrator.services().fetcher.fetched.lock().len(), 2);
}

#[tokio::test]
async fn not_found_fails_permanently() {
    let url = "http://files.test/gone.ndjson";
    let h = fetch_harness(FakeFetcher::new().with_response(
        url,
        FakeFetchResponse::Error(ErrorRecord::from_http_status(404, "not found", Utc::now())),
    ));

    let (job, _) = h
        .orchestrator
        .create_job(url, config_with_steps(vec![StepName::HttpImport]))
        .unwrap();
    let failed = h.orchestrator.run_job(&job.job_id).await.unwrap();

    assert_eq!(failed.status, Status::Failed);
    assert_eq!(failed.steps[0].retry_count, 0);
}
