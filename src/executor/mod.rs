//! Probe coordination
//!
//! A [`ProbeSession`] fans one probe per resolved address out over a bounded
//! worker pool, collects every outcome exactly once, optionally enriches the
//! classified results and returns them in a stable order. Each run owns its
//! own semaphore and channel, so independent sessions never share state.

pub mod summary;

pub use summary::{CategorySummary, RunSummary};

use crate::{
    defaults,
    enrich::EnrichmentPipeline,
    error::{AppError, Result},
    models::{ProbeResult, ProbeTarget},
    probe::{ProbeOutcome, Prober},
    types::FailureKind,
};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;

/// Settings fixed for the duration of one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfiguration {
    /// Maximum probes in flight
    pub workers: usize,
    /// Per-probe timeout
    pub probe_timeout: Duration,
    /// Co-location threshold
    pub threshold: Duration,
    /// TLS port probed on every address
    pub port: u16,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            workers: defaults::DEFAULT_WORKERS,
            probe_timeout: defaults::DEFAULT_PROBE_TIMEOUT,
            threshold: crate::models::config::threshold_from_ms(defaults::DEFAULT_THRESHOLD_MS),
            port: defaults::DEFAULT_PORT,
        }
    }
}

impl RunConfiguration {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(AppError::config("Worker count must be greater than 0"));
        }
        if self.probe_timeout.is_zero() {
            return Err(AppError::config("Probe timeout must be greater than 0"));
        }
        if self.threshold.is_zero() {
            return Err(AppError::config("Threshold must be greater than 0"));
        }
        if self.port == 0 {
            return Err(AppError::config("Port must be between 1 and 65535"));
        }
        Ok(())
    }

    /// Upper bound on probing wall-clock time for `targets` probes:
    /// `ceil(targets / workers) * probe_timeout`
    pub fn worst_case_probe_time(&self, targets: usize) -> Duration {
        let waves = targets.div_ceil(self.workers.max(1));
        self.probe_timeout.saturating_mul(waves as u32)
    }
}

/// Passive per-probe progress callback
///
/// Observers are notified from the coordinator's collection loop and cannot
/// influence which results are produced or their order.
pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_probe_complete(&self, result: &ProbeResult, completed: usize, total: usize);

    fn on_enrichment_start(&self, _addresses: usize) {}

    fn on_finish(&self) {}
}

/// One bounded-concurrency measurement pass
pub struct ProbeSession {
    config: RunConfiguration,
    prober: Arc<dyn Prober>,
    enrichment: Option<EnrichmentPipeline>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProbeSession {
    pub fn new(config: RunConfiguration, prober: Arc<dyn Prober>) -> Self {
        Self {
            config,
            prober,
            enrichment: None,
            observer: None,
        }
    }

    /// Enrich results after classification; an empty pipeline is ignored
    pub fn with_enrichment(mut self, pipeline: EnrichmentPipeline) -> Self {
        self.enrichment = (!pipeline.is_empty()).then_some(pipeline);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Probe every target and return one result per target, sorted by
    /// (endpoint name, address, domain).
    ///
    /// Only an invalid configuration or an empty target list is an error;
    /// every per-target failure becomes an `Unreachable` result.
    pub async fn run(&self, targets: Vec<ProbeTarget>) -> Result<Vec<ProbeResult>> {
        self.config.validate()?;
        if targets.is_empty() {
            return Err(AppError::config("No endpoints to probe: the endpoint catalog is empty"));
        }

        let total = targets.len();
        if let Some(observer) = &self.observer {
            observer.on_start(total);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let (sender, mut receiver) = mpsc::channel::<(usize, ProbeResult)>(self.config.workers.min(total));
        let mut slots: Vec<Option<ProbeResult>> = vec![None; total];
        let mut completed = 0usize;
        let mut handles = Vec::with_capacity(total);

        for (index, target) in targets.iter().enumerate() {
            let resolved = match target {
                ProbeTarget::Address(resolved) => resolved.clone(),
                ProbeTarget::Unresolved { endpoint, reason } => {
                    let result = ProbeResult::unresolved(endpoint, reason.clone());
                    completed += 1;
                    self.notify(&result, completed, total);
                    slots[index] = Some(result);
                    continue;
                }
            };

            let semaphore = Arc::clone(&semaphore);
            let prober = Arc::clone(&self.prober);
            let sender = sender.clone();
            let threshold = self.config.threshold;
            let probe_timeout = self.config.probe_timeout;

            handles.push((index, tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                // Bound every probe here too, whatever the prober does internally
                let outcome = match timeout(probe_timeout, prober.probe(&resolved.endpoint.domain, resolved.address)).await {
                    Ok(outcome) => outcome,
                    Err(_) => ProbeOutcome::failure(
                        FailureKind::Timeout,
                        format!("no handshake within {} ms", probe_timeout.as_millis()),
                    ),
                };
                let result = ProbeResult::measured(&resolved, &outcome, threshold);
                let _ = sender.send((index, result)).await;
            })));
        }

        // Receiver ends once every worker has sent or died
        drop(sender);

        while let Some((index, result)) = receiver.recv().await {
            completed += 1;
            self.notify(&result, completed, total);
            slots[index] = Some(result);
        }

        let (indices, handles): (Vec<usize>, Vec<_>) = handles.into_iter().unzip();
        let mut join_failures: HashMap<usize, String> = indices
            .into_iter()
            .zip(join_all(handles).await)
            .filter_map(|(index, joined)| joined.err().map(|e| (index, format!("probe worker failed: {}", e))))
            .collect();

        let mut results = Vec::with_capacity(total);
        for (index, (slot, target)) in slots.into_iter().zip(&targets).enumerate() {
            let result = match slot {
                Some(result) => result,
                None => {
                    let reason = join_failures
                        .remove(&index)
                        .unwrap_or_else(|| "probe worker exited without reporting".to_string());
                    let result = ProbeResult::aborted(target.endpoint(), target.address(), reason);
                    completed += 1;
                    self.notify(&result, completed, total);
                    result
                }
            };
            results.push(result);
        }

        if let Some(pipeline) = &self.enrichment {
            results = self.enrich(pipeline, results).await;
        }

        sort_results(&mut results);

        if let Some(observer) = &self.observer {
            observer.on_finish();
        }

        Ok(results)
    }

    /// Enrich each distinct probed address once, bounded by the worker limit
    async fn enrich(&self, pipeline: &EnrichmentPipeline, results: Vec<ProbeResult>) -> Vec<ProbeResult> {
        let mut addresses: Vec<IpAddr> = results.iter().filter_map(ProbeResult::address).collect();
        addresses.sort();
        addresses.dedup();

        if let Some(observer) = &self.observer {
            observer.on_enrichment_start(addresses.len());
        }

        let enriched: HashMap<IpAddr, _> = stream::iter(addresses)
            .map(|address| async move { (address, pipeline.enrich(address).await) })
            .buffer_unordered(self.config.workers)
            .collect()
            .await;

        results
            .into_iter()
            .map(|result| match result.address().and_then(|a| enriched.get(&a)) {
                Some(enrichment) => result.with_enrichment(enrichment.clone()),
                None => result,
            })
            .collect()
    }

    fn notify(&self, result: &ProbeResult, completed: usize, total: usize) {
        if let Some(observer) = &self.observer {
            observer.on_probe_complete(result, completed, total);
        }
    }
}

/// Stable report ordering: endpoint name, then address, then domain
pub fn sort_results(results: &mut [ProbeResult]) {
    results.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
