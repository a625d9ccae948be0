//! Report rendering and console output
//!
//! - `json`: machine-readable report, one object per result
//! - `html`: self-contained DataTables page
//! - `console`: colored end-of-run summary and per-category breakdown
//! - `progress`: indicatif progress bar driven by the coordinator

pub mod console;
pub mod html;
pub mod json;
pub mod progress;

pub use console::ConsoleReporter;
pub use html::{render_html, save_html};
pub use json::{render_json, save_json, ReportRow};
pub use progress::ProgressBarObserver;

use crate::error::{ErrorContext, Result};
use std::path::Path;

/// Write a report, creating missing parent directories
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Milliseconds rounded to two decimals for display
pub fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}
