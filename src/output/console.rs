//! Console summary output

use super::round_ms;
use crate::executor::RunSummary;
use crate::models::ProbeResult;
use crate::types::ProbeStatus;
use colored::*;
use std::fmt::Write as _;
use std::path::Path;

/// Renders end-of-run output for the terminal
pub struct ConsoleReporter {
    use_color: bool,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.use_color {
            return text.to_string();
        }
        let painted = text.color(color);
        if bold {
            painted.bold().to_string()
        } else {
            painted.to_string()
        }
    }

    fn status_color(status: ProbeStatus) -> Color {
        match status {
            ProbeStatus::CoLocated => Color::Green,
            ProbeStatus::ReachableDistant => Color::Yellow,
            ProbeStatus::Unreachable => Color::Red,
        }
    }

    /// Final summary line plus report locations
    pub fn render_summary(&self, summary: &RunSummary, json_path: &Path, html_path: &Path) -> String {
        let headline = format!(
            "DONE! {}/{} IPs are COLO ({:.1}%)",
            summary.co_located,
            summary.total,
            summary.co_located_percentage()
        );
        let color = if summary.co_located > 0 { Color::Green } else { Color::Yellow };

        let mut out = String::new();
        let _ = writeln!(out, "\n{}", self.paint(&headline, color, true));
        let _ = writeln!(out, "JSON: {}", json_path.display());
        let _ = write!(out, "HTML: {}", html_path.display());
        out
    }

    /// Per-category counts; only rendered in verbose mode
    pub fn render_category_table(&self, summary: &RunSummary) -> Option<String> {
        if !self.verbose || summary.categories.is_empty() {
            return None;
        }

        let width = summary
            .categories
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(8)
            .max("Category".len());

        let mut out = String::new();
        let header = format!(
            "{:<width$}  {:>5}  {:>5}  {:>5}  {:>5}  {:>10}",
            "Category",
            "Total",
            ProbeStatus::CoLocated.label(),
            ProbeStatus::ReachableDistant.label(),
            ProbeStatus::Unreachable.label(),
            "Best (ms)",
            width = width
        );
        let _ = writeln!(out, "{}", self.paint(&header, Color::Blue, true));
        let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));

        for (name, category) in &summary.categories {
            let best = category
                .best_latency_ms
                .map(|ms| format!("{:.2}", round_ms(ms)))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<width$}  {:>5}  {}  {}  {}  {:>10}",
                name,
                category.total,
                self.paint(&format!("{:>5}", category.co_located), Color::Green, false),
                self.paint(&format!("{:>5}", category.reachable_distant), Color::Yellow, false),
                self.paint(&format!("{:>5}", category.unreachable), Color::Red, false),
                best,
                width = width
            );
        }

        if !summary.failures.is_empty() {
            let mut failures: Vec<_> = summary.failures.iter().collect();
            failures.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
            let detail: Vec<String> = failures
                .into_iter()
                .map(|(kind, count)| format!("{} {}", count, kind))
                .collect();
            let _ = write!(out, "\nFailures: {}", detail.join(", "));
        }

        Some(out)
    }

    /// Single line for one result, used in debug output
    pub fn render_result_line(&self, result: &ProbeResult) -> String {
        let latency = result
            .latency_ms()
            .map(|ms| format!("{:>8.2} ms", round_ms(ms)))
            .unwrap_or_else(|| format!("{:>11}", "-"));
        let address = result
            .address()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unresolved".to_string());
        let status = self.paint(result.status().label(), Self::status_color(result.status()), true);

        format!("{} {} {:<15} {} {}", status, latency, address, result.name(), result.domain())
    }

    pub fn print_summary(&self, summary: &RunSummary, json_path: &Path, html_path: &Path) {
        println!("{}", self.render_summary(summary, json_path, html_path));
        if let Some(table) = self.render_category_table(summary) {
            println!("\n{}", table);
        }
    }
}
