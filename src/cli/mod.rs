//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

/// Colo Latency Probe - finds exchange endpoints co-located with this host
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "colo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Endpoint catalog file
    #[arg(long, value_name = "PATH")]
    pub url_file: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(long, value_name = "PATH")]
    pub output_json: Option<PathBuf>,

    /// Where to write the HTML report
    #[arg(long, value_name = "PATH")]
    pub output_html: Option<PathBuf>,

    /// Append-only run log
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Maximum number of probes in flight (1-1024)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Co-location threshold in milliseconds
    #[arg(long, value_name = "MS")]
    pub threshold: Option<f64>,

    /// Per-probe timeout in seconds (1-60)
    #[arg(short, long, value_name = "SECS", value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// TLS port to probe
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Skip IP geolocation lookups
    #[arg(long)]
    pub no_geo: bool,

    /// Skip reverse DNS / cloud region lookups
    #[arg(long)]
    pub no_cloud_region: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Hide the progress bar
    #[arg(short, long, conflicts_with_all = ["verbose", "debug"])]
    pub quiet: bool,

    /// List supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }
}

/// Parse duration from seconds string; range checks happen in `Config::validate`
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>().map_err(|_| format!("Invalid duration: {}", s))
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
