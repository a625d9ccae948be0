//! Colo Latency Probe
//!
//! Measures TLS handshake latency from this host to every address advertised
//! by a catalog of exchange endpoints, classifies each address as co-located,
//! reachable-but-distant or unreachable, and enriches the results with
//! geolocation and cloud-region metadata before reporting them.

pub mod app;
pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod dns;
pub mod enrich;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod probe;
pub mod types;

// Re-export commonly used types
pub use classifier::classify;
pub use error::{AppError, Result};
pub use executor::{ProbeSession, ProgressObserver, RunConfiguration};
pub use models::{Config, Endpoint, Enrichment, ProbeResult, ProbeTarget, ResolvedAddress};
pub use types::{FailureKind, ProbeStatus};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_URL_FILE: &str = "data/endpoints.txt";
    pub const DEFAULT_OUTPUT_JSON: &str = "results/latency_results.json";
    pub const DEFAULT_OUTPUT_HTML: &str = "results/latency_results.html";
    pub const DEFAULT_LOG_FILE: &str = "results/latency.log";
    pub const DEFAULT_WORKERS: usize = 80;
    pub const MAX_WORKERS: usize = 1024;
    pub const DEFAULT_THRESHOLD_MS: f64 = 12.0;
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(4);
    pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_ENRICH_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MAX_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_PORT: u16 = 443;
    pub const DEFAULT_GEO_URL: &str = "https://ipwhois.app/json";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
