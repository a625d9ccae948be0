//! IP geolocation via the ipwhois.app JSON API

use super::Enricher;
use crate::{defaults, models::Enrichment, AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// Subset of the ipwhois.app response we use
#[derive(Debug, Deserialize)]
struct IpWhoisResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

/// Country, region and city lookup for an address
pub struct GeoEnricher {
    client: Client,
    base_url: String,
}

impl GeoEnricher {
    /// Enricher against the public ipwhois.app endpoint
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(defaults::DEFAULT_GEO_URL, timeout)
    }

    /// Enricher against an alternative base URL; the address is appended as a path segment
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn lookup(&self, address: IpAddr) -> Result<Option<Enrichment>> {
        let url = format!("{}/{}", self.base_url, address);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::network(format!(
                "Geolocation service returned {} for {}",
                response.status(),
                address
            )));
        }

        let body: IpWhoisResponse = response.json().await?;
        if body.success == Some(false) {
            return Ok(None);
        }

        let enrichment = Enrichment {
            country: non_empty(body.country),
            region: non_empty(body.region),
            city: non_empty(body.city),
            ..Default::default()
        };

        Ok((!enrichment.is_empty()).then_some(enrichment))
    }
}

#[async_trait]
impl Enricher for GeoEnricher {
    fn name(&self) -> &'static str {
        "geo"
    }

    async fn enrich(&self, address: IpAddr) -> Option<Enrichment> {
        self.lookup(address).await.ok().flatten()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
