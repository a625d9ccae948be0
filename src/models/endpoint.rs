//! Endpoint descriptors and the address-level work items derived from them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// A named, categorized service domain taken from the endpoint catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Unique logical name (e.g. `SPOT_REST_URL`)
    pub name: String,
    /// Grouping label (e.g. "Spot", "Futures")
    pub category: String,
    /// Host name to resolve and use for SNI
    pub domain: String,
}

impl Endpoint {
    pub fn new<N, C, D>(name: N, category: C, domain: D) -> Self
    where
        N: Into<String>,
        C: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            category: category.into(),
            domain: domain.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.domain)
    }
}

/// One numeric address advertised for an endpoint's domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub endpoint: Arc<Endpoint>,
    pub address: IpAddr,
}

impl ResolvedAddress {
    pub fn new(endpoint: Arc<Endpoint>, address: IpAddr) -> Self {
        Self { endpoint, address }
    }
}

/// A unit of work handed to the coordinator
///
/// Every endpoint expands into at least one target: one `Address` per
/// resolved address, or a single `Unresolved` sentinel when resolution
/// produced nothing, so no endpoint can disappear from the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    Address(ResolvedAddress),
    Unresolved {
        endpoint: Arc<Endpoint>,
        reason: String,
    },
}

impl ProbeTarget {
    pub fn endpoint(&self) -> &Arc<Endpoint> {
        match self {
            Self::Address(resolved) => &resolved.endpoint,
            Self::Unresolved { endpoint, .. } => endpoint,
        }
    }

    pub fn address(&self) -> Option<IpAddr> {
        match self {
            Self::Address(resolved) => Some(resolved.address),
            Self::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Address(_))
    }
}

impl From<ResolvedAddress> for ProbeTarget {
    fn from(resolved: ResolvedAddress) -> Self {
        Self::Address(resolved)
    }
}
