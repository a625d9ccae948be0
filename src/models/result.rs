//! Classified probe results and the optional metadata attached to them

use crate::{
    classifier::classify,
    models::endpoint::{Endpoint, ResolvedAddress},
    probe::ProbeOutcome,
    types::{FailureKind, ProbeStatus},
};
use serde::{Deserialize, Serialize, Serializer};
use std::net::IpAddr;
use std::time::Duration;

/// Best-effort metadata for an address; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    /// Cloud-provider placement tag, e.g. `AWS ap-northeast-1 (Tokyo)`
    pub cloud_region: Option<String>,
    /// Raw PTR name of the address
    pub reverse_dns: Option<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.region.is_none()
            && self.city.is_none()
            && self.cloud_region.is_none()
            && self.reverse_dns.is_none()
    }

    /// Fill fields that are still absent from `other`; present fields win.
    pub fn merge(&mut self, other: Enrichment) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.country, other.country);
        fill(&mut self.region, other.region);
        fill(&mut self.city, other.city);
        fill(&mut self.cloud_region, other.cloud_region);
        fill(&mut self.reverse_dns, other.reverse_dns);
    }
}

/// Failure detail carried by unreachable results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub kind: FailureKind,
    pub detail: String,
}

/// Final, classified record for one resolved address (or one unresolved endpoint)
///
/// Fields are private so the pairing between `success`, `elapsed` and
/// `status` can only be established by the constructors:
/// `status == Unreachable` exactly when `success == false`, and `elapsed` is
/// present exactly when `success == true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    endpoint: Endpoint,
    address: Option<IpAddr>,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    elapsed: Option<Duration>,
    success: bool,
    status: ProbeStatus,
    failure: Option<ProbeFailure>,
    enrichment: Enrichment,
}

impl ProbeResult {
    /// Build the record for a probed address by classifying its outcome
    pub fn measured(target: &ResolvedAddress, outcome: &ProbeOutcome, threshold: Duration) -> Self {
        let status = classify(outcome, threshold);
        let (elapsed, failure) = match outcome {
            ProbeOutcome::Success { elapsed } => (Some(*elapsed), None),
            ProbeOutcome::Failure { kind, detail } => (
                None,
                Some(ProbeFailure {
                    kind: *kind,
                    detail: detail.clone(),
                }),
            ),
        };

        Self {
            endpoint: target.endpoint.as_ref().clone(),
            address: Some(target.address),
            elapsed,
            success: outcome.is_success(),
            status,
            failure,
            enrichment: Enrichment::default(),
        }
    }

    /// Sentinel record for an endpoint whose domain produced no address
    pub fn unresolved(endpoint: &Endpoint, reason: impl Into<String>) -> Self {
        Self::failed(endpoint, None, FailureKind::Resolution, reason)
    }

    /// Record for a target whose worker never reported back
    pub fn aborted(endpoint: &Endpoint, address: Option<IpAddr>, reason: impl Into<String>) -> Self {
        Self::failed(endpoint, address, FailureKind::Aborted, reason)
    }

    fn failed(endpoint: &Endpoint, address: Option<IpAddr>, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.clone(),
            address,
            elapsed: None,
            success: false,
            status: ProbeStatus::Unreachable,
            failure: Some(ProbeFailure {
                kind,
                detail: reason.into(),
            }),
            enrichment: Enrichment::default(),
        }
    }

    /// Attach enrichment metadata; status and timing are untouched
    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn name(&self) -> &str {
        &self.endpoint.name
    }

    pub fn category(&self) -> &str {
        &self.endpoint.category
    }

    pub fn domain(&self) -> &str {
        &self.endpoint.domain
    }

    pub fn address(&self) -> Option<IpAddr> {
        self.address
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Elapsed handshake time in milliseconds, if the probe succeeded
    pub fn latency_ms(&self) -> Option<f64> {
        self.elapsed.map(duration_ms)
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        self.failure.as_ref()
    }

    pub fn enrichment(&self) -> &Enrichment {
        &self.enrichment
    }

    /// Ordering key used before results are handed to reporters
    pub fn sort_key(&self) -> (&str, Option<IpAddr>, &str) {
        (&self.endpoint.name, self.address, &self.endpoint.domain)
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

fn serialize_millis<S>(value: &Option<Duration>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => serializer.serialize_some(&duration_ms(*duration)),
        None => serializer.serialize_none(),
    }
}
