//! Proptest strategies shared by this crate's tests and dependents.

use crate::error::{ErrorKind, ErrorRecord};
use crate::job::StepName;
use chrono::{DateTime, Utc};
use proptest::prelude::*;

pub fn step_name_strategy() -> impl Strategy<Value = StepName> {
    proptest::sample::select(StepName::ALL.to_vec())
}

pub fn error_kind_strategy() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![Just(ErrorKind::Transient), Just(ErrorKind::Permanent)]
}

pub fn error_record_strategy() -> impl Strategy<Value = ErrorRecord> {
    (
        error_kind_strategy(),
        "[a-z ]{1,32}",
        proptest::option::of(400u16..600),
        1_600_000_000i64..1_900_000_000,
    )
        .prop_map(|(kind, message, http_status, secs)| ErrorRecord {
            kind,
            message,
            http_status,
            timestamp: DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default(),
        })
}
