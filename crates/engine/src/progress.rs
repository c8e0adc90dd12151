//! Progress reporting seam between the engine and the CLI.

use aether_core::StepName;

/// Callbacks emitted while a step executes. The CLI renders them as
/// progress bars; everything else uses [`NoopProgress`].
pub trait Progress: Send + Sync {
    fn step_started(&self, _step: StepName) {}
    fn file_completed(&self, _name: &str, _bytes: u64) {}
    fn message(&self, _text: &str) {}
    fn step_completed(&self, _step: StepName) {}
}

/// Silent progress sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl Progress for NoopProgress {}
