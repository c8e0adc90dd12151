//! Shared fixtures for engine tests.

use crate::progress::NoopProgress;
use crate::services::Services;
use crate::Orchestrator;
use aether_adapters::fakes::{FakeConvert, FakeDimp, FakeFetcher, FakeTorch};
use aether_core::{FakeClock, ProjectConfig, StepName};
use aether_storage::JobStore;
use std::path::Path;
use std::sync::Arc;

pub(crate) type FakeOrchestrator =
    Orchestrator<FakeTorch, FakeDimp, FakeConvert, FakeFetcher, FakeClock>;

pub(crate) struct Harness {
    pub dir: tempfile::TempDir,
    pub orchestrator: FakeOrchestrator,
    pub clock: FakeClock,
}

impl Harness {
    pub fn input_dir(&self) -> std::path::PathBuf {
        let dir = self.dir.path().join("input");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn store(&self) -> &JobStore {
        self.orchestrator.store()
    }
}

pub(crate) fn harness(services: Services<FakeTorch, FakeDimp, FakeConvert, FakeFetcher>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path().join("jobs"));
    let clock = FakeClock::new();
    let orchestrator = Orchestrator::new(store, services, clock.clone(), Arc::new(NoopProgress));
    Harness { dir, orchestrator, clock }
}

pub(crate) fn echo_services() -> Services<FakeTorch, FakeDimp, FakeConvert, FakeFetcher> {
    Services::new(FakeTorch::default(), FakeDimp::echo(), FakeConvert::new(), FakeFetcher::new())
}

/// Config with fast backoffs so retry tests finish quickly.
pub(crate) fn config_with_steps(steps: Vec<StepName>) -> ProjectConfig {
    let mut config = ProjectConfig::default();
    config.pipeline.enabled_steps = steps;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 4;
    config.services.dimp.url = Some("http://dimp.test".into());
    config.services.torch.base_url = Some("http://torch.test".into());
    config.services.torch.polling_interval_seconds = 1;
    config.services.torch.max_polling_interval_seconds = 2;
    config.services.csv_conversion_url = Some("http://csv.test".into());
    config.services.parquet_conversion_url = Some("http://parquet.test".into());
    config
}

pub(crate) fn write_ndjson(dir: &Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(&path, content).unwrap();
    path
}
