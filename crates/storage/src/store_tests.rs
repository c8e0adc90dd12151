use super::*;
use aether_core::{InputType, Job, ProjectConfig};
use chrono::{DateTime, Utc};

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

fn job(id: &str, created_secs: i64) -> Job {
    Job::new(id, "/data/in", InputType::LocalDir, ProjectConfig::default(), at(created_secs))
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path());
    store.create_layout("job-1").unwrap();

    let job = job("job-1", 0);
    store.save(&job).unwrap();
    let loaded = store.load("job-1").unwrap();
    assert_eq!(loaded, job);
}

#[test]
fn create_layout_builds_all_step_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path());
    let paths = store.create_layout("job-1").unwrap();

    assert!(paths.import_dir().is_dir());
    assert!(paths.pseudonymized_dir().is_dir());
    assert!(paths.csv_dir().is_dir());
    assert!(paths.parquet_dir().is_dir());
}

#[test]
fn load_missing_job_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path());
    assert!(matches!(store.load("ghost"), Err(StoreError::NotFound(_))));
}

#[test]
fn load_corrupt_state_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path());
    let paths = store.create_layout("job-1").unwrap();
    std::fs::write(paths.state_file(), "{ not json").unwrap();

    assert!(matches!(store.load("job-1"), Err(StoreError::Corrupt { .. })));
}

#[test]
fn save_is_idempotent_on_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path());
    let paths = store.create_layout("job-1").unwrap();
    let job = job("job-1", 0);

    store.save(&job).unwrap();
    let first = std::fs::read(paths.state_file()).unwrap();
    store.save(&job).unwrap();
    let second = std::fs::read(paths.state_file()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path());
    let paths = store.create_layout("job-1").unwrap();
    store.save(&job("job-1", 0)).unwrap();

    let names: Vec<String> = std::fs::read_dir(paths.root())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(!names.iter().any(|n| n.contains("tmp")), "temp file left behind: {names:?}");
}

#[test]
fn list_sorts_newest_first_and_skips_broken_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path());

    for (id, secs) in [("job-old", 10), ("job-new", 30), ("job-mid", 20)] {
        store.create_layout(id).unwrap();
        store.save(&job(id, secs)).unwrap();
    }
    // Directory without state.json.
    store.create_layout("job-empty").unwrap();
    // Directory with corrupt state.json.
    let corrupt = store.create_layout("job-corrupt").unwrap();
    std::fs::write(corrupt.state_file(), "garbage").unwrap();
    // Stray plain file in jobs_dir.
    std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

    let jobs = store.list().unwrap();
    let ids: Vec<&str> = jobs.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, vec!["job-new", "job-mid", "job-old"]);
}

#[test]
fn list_with_missing_jobs_dir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path().join("never-created"));
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn concurrent_readers_never_observe_a_torn_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path());
    store.create_layout("job-1").unwrap();
    store.save(&job("job-1", 0)).unwrap();

    let writer_store = store.clone();
    let writer = std::thread::spawn(move || {
        for i in 0..200 {
            let mut j = job("job-1", 0);
            j.total_files = i;
            j.input_source = format!("/data/in-{i}");
            writer_store.save(&j).unwrap();
        }
    });

    for _ in 0..200 {
        // Every read must parse: partial writes are never visible.
        let loaded = store.load("job-1").unwrap();
        assert_eq!(loaded.job_id, "job-1");
    }
    writer.join().unwrap();
}
