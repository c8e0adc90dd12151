//! Error-as-data records for pipeline failures.
//!
//! Step workers return [`ErrorRecord`] values instead of raising; the step
//! executor inspects the [`ErrorKind`] to decide between retry and failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retry classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Eligible for retry with backoff: network errors, HTTP 5xx, 408, 429.
    Transient,
    /// Not retried: other HTTP 4xx, malformed input, validation failures.
    Permanent,
}

crate::simple_display! {
    ErrorKind {
        Transient => "TRANSIENT",
        Permanent => "PERMANENT",
    }
}

/// Structured record accompanying every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn transient(message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: message.into(),
            http_status: None,
            timestamp: at,
        }
    }

    pub fn permanent(message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
            http_status: None,
            timestamp: at,
        }
    }

    /// Build a record from an HTTP status using the classification rule.
    pub fn from_http_status(status: u16, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind: classify_status(status),
            message: message.into(),
            http_status: Some(status),
            timestamp: at,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.http_status {
            Some(code) => write!(f, "{}: {} (http {})", self.kind, self.message, code),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Classify an HTTP status code.
///
/// 408 and 429 are retryable despite being 4xx; all 5xx are retryable.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        408 | 429 => ErrorKind::Transient,
        500..=599 => ErrorKind::Transient,
        _ => ErrorKind::Permanent,
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
