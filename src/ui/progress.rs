use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::models::HostAssessment;

/// Single spinner on stderr. Hidden when log output would interleave with it.
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new(visible: bool) -> Self {
        let bar = if visible { ProgressBar::new_spinner() } else { ProgressBar::hidden() };
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn update(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn host_done(&self, record: &HostAssessment, done: usize, total: usize) {
        let label = if record.vendor.is_empty() { "no fingerprint" } else { record.vendor.as_str() };
        self.bar
            .set_message(format!("Assessed {}/{} hosts (last: {}, {})", done, total, record.host, label));
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
