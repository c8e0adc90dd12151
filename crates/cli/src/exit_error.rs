//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use aether_engine::{CreateError, RunError};
use aether_storage::StoreError;
use std::fmt;

/// Job failed (a step ended PERMANENT or exhausted its retry budget).
pub const EXIT_JOB_FAILED: i32 = 1;
/// Invalid input or configuration.
pub const EXIT_INVALID: i32 = 2;
/// Another process holds the job lock.
pub const EXIT_CONCURRENT: i32 = 3;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<CreateError> for ExitError {
    fn from(err: CreateError) -> Self {
        Self::new(EXIT_INVALID, err.to_string())
    }
}

impl From<RunError> for ExitError {
    fn from(err: RunError) -> Self {
        let code = match &err {
            RunError::Contended(_) => EXIT_CONCURRENT,
            _ => EXIT_INVALID,
        };
        Self::new(code, err.to_string())
    }
}

impl From<StoreError> for ExitError {
    fn from(err: StoreError) -> Self {
        Self::new(EXIT_INVALID, err.to_string())
    }
}
