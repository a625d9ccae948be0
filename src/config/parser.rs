//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};
use std::path::PathBuf;

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
    env_file: Option<PathBuf>,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            env_file: Some(PathBuf::from(".env")),
        }
    }

    /// Skip loading any dotenv file
    pub fn without_env_file(mut self) -> Self {
        self.env_file = None;
        self
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        self.load_env_file()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    fn load_env_file(&self) -> Result<()> {
        match &self.env_file {
            Some(path) => EnvManager::load_env_file_from(path, self.cli.debug),
            None => Ok(()),
        }
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(path) = &cli.url_file {
            config.url_file = path.clone();
        }
        if let Some(path) = &cli.output_json {
            config.output_json = path.clone();
        }
        if let Some(path) = &cli.output_html {
            config.output_html = path.clone();
        }
        if let Some(path) = &cli.log_file {
            config.log_file = path.clone();
        }
        if let Some(workers) = cli.workers {
            config.workers = workers;
        }
        if let Some(threshold) = cli.threshold {
            config.threshold_ms = threshold;
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(port) = cli.port {
            config.port = port;
        }

        // Negative flags only ever switch a feature off
        if cli.no_geo {
            config.enable_geo = false;
        }
        if cli.no_cloud_region {
            config.enable_cloud_region = false;
        }
        if !cli.use_colors() {
            config.enable_color = false;
        }

        config.verbose = cli.verbose || cli.debug;
        config.debug = cli.debug;
        config.quiet = cli.quiet;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("URL File: {}", config.url_file.display()));
    summary.push(format!("JSON Report: {}", config.output_json.display()));
    summary.push(format!("HTML Report: {}", config.output_html.display()));
    summary.push(format!("Log File: {}", config.log_file.display()));
    summary.push(format!("Workers: {}", config.workers));
    summary.push(format!("Threshold: {} ms", config.threshold_ms));
    summary.push(format!("Probe Timeout: {}s", config.timeout_seconds));
    summary.push(format!("DNS Timeout: {}s", config.dns_timeout_seconds));
    summary.push(format!("Enrichment Timeout: {}s", config.enrich_timeout_seconds));
    summary.push(format!("Port: {}", config.port));
    summary.push(format!(
        "Geolocation: {}",
        if config.enable_geo { config.geo_url.as_str() } else { "off" }
    ));
    summary.push(format!("Cloud Region: {}", config.enable_cloud_region));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
