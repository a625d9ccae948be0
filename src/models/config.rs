//! Configuration data model and validation

use crate::defaults;
use crate::error::{AppError, Result};
use crate::executor::RunConfiguration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint catalog to load
    #[serde(default = "default_url_file")]
    pub url_file: PathBuf,

    /// JSON report destination
    #[serde(default = "default_output_json")]
    pub output_json: PathBuf,

    /// HTML report destination
    #[serde(default = "default_output_html")]
    pub output_html: PathBuf,

    /// Append-only log file
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Maximum probes in flight
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Co-location threshold in milliseconds
    #[serde(default = "default_threshold_ms")]
    pub threshold_ms: f64,

    /// Per-probe timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Per-query DNS timeout
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_seconds: u64,

    /// Per-enricher timeout
    #[serde(default = "default_enrich_timeout_secs")]
    pub enrich_timeout_seconds: u64,

    /// TLS port probed on every address
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub enable_geo: bool,

    /// Geolocation service base URL; the address is appended as a path segment
    #[serde(default = "default_geo_url")]
    pub geo_url: String,

    #[serde(default = "default_true")]
    pub enable_cloud_region: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Hide the progress bar and configuration warnings
    #[serde(default)]
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_file: default_url_file(),
            output_json: default_output_json(),
            output_html: default_output_html(),
            log_file: default_log_file(),
            workers: default_workers(),
            threshold_ms: default_threshold_ms(),
            timeout_seconds: default_timeout_secs(),
            dns_timeout_seconds: default_dns_timeout_secs(),
            enrich_timeout_seconds: default_enrich_timeout_secs(),
            port: default_port(),
            enable_geo: true,
            geo_url: default_geo_url(),
            enable_cloud_region: true,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            quiet: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_seconds)
    }

    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_secs(self.enrich_timeout_seconds)
    }

    /// Threshold as a duration, exact to the nanosecond for millisecond inputs
    pub fn threshold(&self) -> Duration {
        threshold_from_ms(self.threshold_ms)
    }

    /// Whether any enrichment hook is enabled
    pub fn enrichment_enabled(&self) -> bool {
        self.enable_geo || self.enable_cloud_region
    }

    /// Settings consumed by the probe coordinator
    pub fn run_configuration(&self) -> RunConfiguration {
        RunConfiguration {
            workers: self.workers,
            probe_timeout: self.probe_timeout(),
            threshold: self.threshold(),
            port: self.port,
        }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        for (label, path) in [
            ("URL file", &self.url_file),
            ("JSON output path", &self.output_json),
            ("HTML output path", &self.output_html),
            ("Log file path", &self.log_file),
        ] {
            if path.as_os_str().is_empty() {
                return Err(AppError::config(format!("{} cannot be empty", label)));
            }
        }

        if self.workers == 0 {
            return Err(AppError::config("Worker count must be greater than 0"));
        }

        if self.workers > defaults::MAX_WORKERS {
            return Err(AppError::config(format!(
                "Worker count cannot exceed {}",
                defaults::MAX_WORKERS
            )));
        }

        if !self.threshold_ms.is_finite() || self.threshold_ms <= 0.0 {
            return Err(AppError::config(format!(
                "Threshold must be a positive number of milliseconds, got {}",
                self.threshold_ms
            )));
        }

        for (label, secs) in [
            ("Probe timeout", self.timeout_seconds),
            ("DNS timeout", self.dns_timeout_seconds),
            ("Enrichment timeout", self.enrich_timeout_seconds),
        ] {
            if secs == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", label)));
            }
            if secs > defaults::MAX_TIMEOUT_SECS {
                return Err(AppError::config(format!(
                    "{} cannot exceed {} seconds",
                    label,
                    defaults::MAX_TIMEOUT_SECS
                )));
            }
        }

        if self.port == 0 {
            return Err(AppError::config("Port must be between 1 and 65535"));
        }

        if self.enable_geo {
            url::Url::parse(&self.geo_url).map_err(|e| {
                AppError::config(format!("Invalid geolocation URL '{}': {}", self.geo_url, e))
            })?;
        }

        Ok(())
    }

    /// Merge `COLO_*` environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Some(path) = env_value::<PathBuf>("COLO_URL_FILE")? {
            self.url_file = path;
        }
        if let Some(path) = env_value::<PathBuf>("COLO_OUTPUT_JSON")? {
            self.output_json = path;
        }
        if let Some(path) = env_value::<PathBuf>("COLO_OUTPUT_HTML")? {
            self.output_html = path;
        }
        if let Some(path) = env_value::<PathBuf>("COLO_LOG_FILE")? {
            self.log_file = path;
        }
        if let Some(workers) = env_value("COLO_WORKERS")? {
            self.workers = workers;
        }
        if let Some(threshold) = env_value("COLO_THRESHOLD_MS")? {
            self.threshold_ms = threshold;
        }
        if let Some(timeout) = env_value("COLO_TIMEOUT_SECONDS")? {
            self.timeout_seconds = timeout;
        }
        if let Some(timeout) = env_value("COLO_DNS_TIMEOUT_SECONDS")? {
            self.dns_timeout_seconds = timeout;
        }
        if let Some(timeout) = env_value("COLO_ENRICH_TIMEOUT_SECONDS")? {
            self.enrich_timeout_seconds = timeout;
        }
        if let Some(port) = env_value("COLO_PORT")? {
            self.port = port;
        }
        if let Some(enabled) = env_value("COLO_ENABLE_GEO")? {
            self.enable_geo = enabled;
        }
        if let Some(url) = env_value::<String>("COLO_GEO_URL")? {
            self.geo_url = url;
        }
        if let Some(enabled) = env_value("COLO_ENABLE_CLOUD_REGION")? {
            self.enable_cloud_region = enabled;
        }
        if let Some(enabled) = env_value("COLO_ENABLE_COLOR")? {
            self.enable_color = enabled;
        }

        Ok(())
    }
}

/// Convert a millisecond threshold into a `Duration`
pub fn threshold_from_ms(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((ms * 1_000_000.0).round() as u64)
}

fn env_value<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

// Default value functions for serde
fn default_url_file() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_URL_FILE)
}

fn default_output_json() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_OUTPUT_JSON)
}

fn default_output_html() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_OUTPUT_HTML)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_LOG_FILE)
}

fn default_workers() -> usize {
    defaults::DEFAULT_WORKERS
}

fn default_threshold_ms() -> f64 {
    defaults::DEFAULT_THRESHOLD_MS
}

fn default_timeout_secs() -> u64 {
    defaults::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_dns_timeout_secs() -> u64 {
    defaults::DEFAULT_DNS_TIMEOUT.as_secs()
}

fn default_enrich_timeout_secs() -> u64 {
    defaults::DEFAULT_ENRICH_TIMEOUT.as_secs()
}

fn default_port() -> u16 {
    defaults::DEFAULT_PORT
}

fn default_geo_url() -> String {
    defaults::DEFAULT_GEO_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_enable_color() -> bool {
    defaults::DEFAULT_ENABLE_COLOR
}
