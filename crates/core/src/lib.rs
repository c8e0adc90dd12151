// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aether-core: domain types and pure logic for the Aether pipeline.

pub mod macros;

pub mod bundle;
pub mod clock;
pub mod config;
pub mod crtdl;
pub mod error;
pub mod input;
pub mod job;
pub mod retry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use bundle::{
    is_bundle, reassemble, serialized_size, split_bundle, split_decision, BundleError,
    OversizedResource, SplitDecision,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ConfigError, ConfigWarning, DimpConfig, PipelineConfig, ProjectConfig, RetryConfig,
    ServicesConfig, TorchConfig,
};
pub use crtdl::{CrtdlError, MAX_CRTDL_BYTES};
pub use error::{classify_status, ErrorKind, ErrorRecord};
pub use input::{classify, ClassifyError, InputType};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{Job, Status, Step, StepName, StepReport, UnknownStep, SCHEMA_VERSION};
pub use retry::{backoff, should_retry};
