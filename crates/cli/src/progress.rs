//! indicatif-backed progress rendering for interactive runs.

use aether_core::StepName;
use aether_engine::Progress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {prefix:.bold} {msg} [{pos} files]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for TerminalProgress {
    fn step_started(&self, step: StepName) {
        self.bar.set_prefix(step.to_string());
        self.bar.set_message("");
        self.bar.set_position(0);
    }

    fn file_completed(&self, name: &str, _bytes: u64) {
        self.bar.set_message(name.to_string());
        self.bar.inc(1);
    }

    fn message(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn step_completed(&self, step: StepName) {
        self.bar.println(format!("{step} done"));
    }
}
