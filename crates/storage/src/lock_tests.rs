use super::*;
use std::path::PathBuf;

fn lock_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("state.lock")
}

#[test]
fn try_acquire_fails_fast_when_held() {
    let dir = tempfile::tempdir().unwrap();
    let path = lock_path(&dir);

    let _held = JobLock::try_acquire(&path, "job-1").unwrap();
    match JobLock::try_acquire(&path, "job-1") {
        Err(LockError::Contended(id)) => assert_eq!(id, "job-1"),
        other => panic!("expected Contended, got {other:?}"),
    }
}

#[test]
fn drop_releases_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = lock_path(&dir);

    let held = JobLock::try_acquire(&path, "job-1").unwrap();
    drop(held);
    JobLock::try_acquire(&path, "job-1").unwrap();
}

#[test]
fn blocking_acquire_succeeds_after_release() {
    let dir = tempfile::tempdir().unwrap();
    let path = lock_path(&dir);

    let held = JobLock::try_acquire(&path, "job-1").unwrap();
    let path_clone = path.clone();
    let waiter = std::thread::spawn(move || {
        let _lock = JobLock::acquire(&path_clone, "job-1").unwrap();
    });
    std::thread::sleep(std::time::Duration::from_millis(50));
    drop(held);
    waiter.join().unwrap();
}

#[test]
fn acquire_does_not_truncate_the_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let path = lock_path(&dir);
    std::fs::write(&path, "sentinel").unwrap();

    let lock = JobLock::try_acquire(&path, "job-1").unwrap();
    drop(lock);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "sentinel");
}
