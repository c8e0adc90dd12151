//! Hybrid retry policy: classification plus exponential backoff.

use crate::error::ErrorRecord;
use std::time::Duration;

/// Whether a failed attempt should be retried.
///
/// True iff the error is transient and the attempt budget is not exhausted.
pub fn should_retry(err: &ErrorRecord, attempts: u32, max_attempts: u32) -> bool {
    err.is_transient() && attempts < max_attempts
}

/// Backoff before retry `attempt` (0-based): `min(initial · 2^attempt, max)`.
pub fn backoff(attempt: u32, initial_ms: u64, max_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay = initial_ms.saturating_mul(factor).min(max_ms);
    Duration::from_millis(delay)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
