//! Best-effort metadata for probed addresses
//!
//! Each [`Enricher`] answers for one address and may answer nothing. The
//! [`EnrichmentPipeline`] runs all enabled enrichers concurrently under a
//! shared per-enricher timeout and merges whatever came back. Nothing here
//! can fail a result: a slow or broken enricher just leaves fields empty.

pub mod cloud;
pub mod geo;

pub use cloud::CloudRegionEnricher;
pub use geo::GeoEnricher;

use crate::models::Enrichment;
use async_trait::async_trait;
use futures::future::join_all;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// One pluggable source of address metadata
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Metadata for `address`, or `None` when nothing is known
    async fn enrich(&self, address: IpAddr) -> Option<Enrichment>;
}

/// Concurrent, timeout-bounded fan-out over a set of enrichers
#[derive(Clone)]
pub struct EnrichmentPipeline {
    enrichers: Vec<Arc<dyn Enricher>>,
    timeout: Duration,
}

impl EnrichmentPipeline {
    pub fn new(timeout: Duration) -> Self {
        Self {
            enrichers: Vec::new(),
            timeout,
        }
    }

    /// Add an enricher; earlier enrichers win when two set the same field
    pub fn with_enricher<E: Enricher + 'static>(mut self, enricher: E) -> Self {
        self.enrichers.push(Arc::new(enricher));
        self
    }

    pub fn push(&mut self, enricher: Arc<dyn Enricher>) {
        self.enrichers.push(enricher);
    }

    pub fn is_empty(&self) -> bool {
        self.enrichers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.enrichers.len()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.enrichers.iter().map(|e| e.name()).collect()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run every enricher for `address` and merge the answers
    pub async fn enrich(&self, address: IpAddr) -> Enrichment {
        let lookups = self.enrichers.iter().map(|enricher| {
            let enricher = Arc::clone(enricher);
            let timeout = self.timeout;
            async move { tokio::time::timeout(timeout, enricher.enrich(address)).await.ok().flatten() }
        });

        let mut merged = Enrichment::default();
        for answer in join_all(lookups).await.into_iter().flatten() {
            merged.merge(answer);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Enrichment);

    #[async_trait]
    impl Enricher for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn enrich(&self, _address: IpAddr) -> Option<Enrichment> {
            Some(self.1.clone())
        }
    }

    struct Stalled;

    #[async_trait]
    impl Enricher for Stalled {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn enrich(&self, _address: IpAddr) -> Option<Enrichment> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Some(Enrichment {
                country: Some("never".into()),
                ..Default::default()
            })
        }
    }

    fn addr() -> IpAddr {
        "13.230.0.1".parse().unwrap()
    }

    #[tokio::test]
    async fn test_merges_in_registration_order() {
        let pipeline = EnrichmentPipeline::new(Duration::from_secs(1))
            .with_enricher(Fixed(
                "geo",
                Enrichment {
                    country: Some("Japan".into()),
                    city: Some("Tokyo".into()),
                    ..Default::default()
                },
            ))
            .with_enricher(Fixed(
                "cloud",
                Enrichment {
                    country: Some("ignored".into()),
                    cloud_region: Some("AWS ap-northeast-1 (Tokyo)".into()),
                    ..Default::default()
                },
            ));

        let merged = pipeline.enrich(addr()).await;
        assert_eq!(merged.country.as_deref(), Some("Japan"));
        assert_eq!(merged.city.as_deref(), Some("Tokyo"));
        assert_eq!(merged.cloud_region.as_deref(), Some("AWS ap-northeast-1 (Tokyo)"));
        assert_eq!(pipeline.names(), vec!["geo", "cloud"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_enricher_degrades_to_absent_fields() {
        let pipeline = EnrichmentPipeline::new(Duration::from_secs(5))
            .with_enricher(Stalled)
            .with_enricher(Fixed(
                "cloud",
                Enrichment {
                    reverse_dns: Some("host.example".into()),
                    ..Default::default()
                },
            ));

        let merged = pipeline.enrich(addr()).await;
        assert_eq!(merged.country, None);
        assert_eq!(merged.reverse_dns.as_deref(), Some("host.example"));
    }

    #[tokio::test]
    async fn test_empty_pipeline_yields_empty_enrichment() {
        let pipeline = EnrichmentPipeline::new(Duration::from_secs(1));
        assert!(pipeline.is_empty());
        assert!(pipeline.enrich(addr()).await.is_empty());
    }
}
