use super::*;
use crate::error::ErrorRecord;
use chrono::Utc;
use proptest::prelude::*;

#[test]
fn transient_retries_until_budget_exhausted() {
    let err = ErrorRecord::transient("timeout", Utc::now());
    assert!(should_retry(&err, 0, 3));
    assert!(should_retry(&err, 2, 3));
    assert!(!should_retry(&err, 3, 3));
    assert!(!should_retry(&err, 4, 3));
}

#[test]
fn permanent_never_retries() {
    let err = ErrorRecord::permanent("bad request", Utc::now());
    assert!(!should_retry(&err, 0, 5));
}

#[yare::parameterized(
    first    = { 0, 1000, 30_000, 1000 },
    second   = { 1, 1000, 30_000, 2000 },
    third    = { 2, 1000, 30_000, 4000 },
    capped   = { 10, 1000, 30_000, 30_000 },
    at_cap   = { 5, 1000, 30_000, 30_000 },
)]
fn backoff_doubles_and_caps(attempt: u32, initial: u64, max: u64, expected_ms: u64) {
    assert_eq!(backoff(attempt, initial, max), Duration::from_millis(expected_ms));
}

proptest! {
    #[test]
    fn backoff_never_exceeds_max(attempt in 0u32..256, initial in 1u64..100_000, max in 1u64..10_000_000) {
        prop_assert!(backoff(attempt, initial, max) <= Duration::from_millis(max));
    }

    #[test]
    fn backoff_is_monotonic_below_cap(attempt in 0u32..62, initial in 1u64..1000) {
        let max = u64::MAX;
        prop_assert!(backoff(attempt + 1, initial, max) >= backoff(attempt, initial, max));
    }

    #[test]
    fn transient_with_budget_always_retries(attempts in 0u32..10, extra in 1u32..10) {
        let err = ErrorRecord::transient("flaky", Utc::now());
        prop_assert!(should_retry(&err, attempts, attempts + extra));
        prop_assert!(!should_retry(&err, attempts + extra, attempts));
    }
}
