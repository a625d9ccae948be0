//! Terminal progress bar for a probe run

use crate::executor::ProgressObserver;
use crate::models::ProbeResult;
use crate::types::ProbeStatus;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const TEMPLATE: &str = "[{prefix}] {elapsed_precise} {bar:36.cyan/blue} {pos:>4}/{len:4} {msg}";

/// Progress bar driven by coordinator callbacks
pub struct ProgressBarObserver {
    bar: ProgressBar,
    co_located: AtomicUsize,
}

impl ProgressBarObserver {
    /// Bar drawn to stderr; hidden when `hidden` or stderr is not a terminal
    pub fn new(hidden: bool) -> Self {
        let bar = ProgressBar::new(0);
        if hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("■■□"));
        }
        bar.set_prefix("TLS");

        Self {
            bar,
            co_located: AtomicUsize::new(0),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_probe_complete(&self, result: &ProbeResult, completed: usize, _total: usize) {
        if result.status() == ProbeStatus::CoLocated {
            self.co_located.fetch_add(1, Ordering::Relaxed);
        }
        self.bar.set_position(completed as u64);
        self.bar
            .set_message(format!("{} COLO", self.co_located.load(Ordering::Relaxed)));
    }

    fn on_enrichment_start(&self, addresses: usize) {
        self.bar.set_prefix("GEO");
        self.bar.set_message(format!("enriching {} addresses", addresses));
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}
