//! Aggregate counts over a finished run

use crate::models::ProbeResult;
use crate::types::{FailureKind, ProbeStatus};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Per-category breakdown used by the verbose console report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySummary {
    pub total: usize,
    pub co_located: usize,
    pub reachable_distant: usize,
    pub unreachable: usize,
    /// Fastest successful handshake in the category
    pub best_latency_ms: Option<f64>,
}

impl CategorySummary {
    fn record(&mut self, result: &ProbeResult) {
        self.total += 1;
        match result.status() {
            ProbeStatus::CoLocated => self.co_located += 1,
            ProbeStatus::ReachableDistant => self.reachable_distant += 1,
            ProbeStatus::Unreachable => self.unreachable += 1,
        }
        if let Some(ms) = result.latency_ms() {
            self.best_latency_ms = Some(self.best_latency_ms.map_or(ms, |best| best.min(ms)));
        }
    }

    pub fn co_located_percentage(&self) -> f64 {
        percentage(self.co_located, self.total)
    }
}

/// Counts by status, failure kind and category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub co_located: usize,
    pub reachable_distant: usize,
    pub unreachable: usize,
    /// Endpoints that never resolved to an address
    pub unresolved: usize,
    pub failures: HashMap<FailureKind, usize>,
    pub categories: BTreeMap<String, CategorySummary>,
}

impl RunSummary {
    pub fn from_results(results: &[ProbeResult]) -> Self {
        let mut summary = Self::default();

        for result in results {
            summary.total += 1;
            match result.status() {
                ProbeStatus::CoLocated => summary.co_located += 1,
                ProbeStatus::ReachableDistant => summary.reachable_distant += 1,
                ProbeStatus::Unreachable => summary.unreachable += 1,
            }

            if let Some(failure) = result.failure() {
                *summary.failures.entry(failure.kind).or_default() += 1;
                if failure.kind == FailureKind::Resolution {
                    summary.unresolved += 1;
                }
            }

            summary
                .categories
                .entry(result.category().to_string())
                .or_default()
                .record(result);
        }

        summary
    }

    /// Share of all records classified as co-located
    pub fn co_located_percentage(&self) -> f64 {
        percentage(self.co_located, self.total)
    }

    pub fn failure_count(&self, kind: FailureKind) -> usize {
        self.failures.get(&kind).copied().unwrap_or(0)
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
