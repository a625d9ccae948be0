//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a dotenv file from `path`; a missing file is not an error
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "COLO_WORKERS" => {
                let workers: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if workers == 0 || workers > crate::defaults::MAX_WORKERS {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}",
                        key,
                        crate::defaults::MAX_WORKERS,
                        workers
                    )));
                }
            }
            "COLO_THRESHOLD_MS" => {
                let ms: f64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !ms.is_finite() || ms <= 0.0 {
                    return Err(AppError::config(format!("{} must be positive, got: {}", key, value)));
                }
            }
            "COLO_TIMEOUT_SECONDS" | "COLO_DNS_TIMEOUT_SECONDS" | "COLO_ENRICH_TIMEOUT_SECONDS" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if secs == 0 || secs > crate::defaults::MAX_TIMEOUT_SECS {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}",
                        key,
                        crate::defaults::MAX_TIMEOUT_SECS,
                        secs
                    )));
                }
            }
            "COLO_PORT" => {
                let port: u16 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if port == 0 {
                    return Err(AppError::config(format!("{} must be between 1 and 65535", key)));
                }
            }
            "COLO_ENABLE_GEO" | "COLO_ENABLE_CLOUD_REGION" | "COLO_ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "COLO_URL_FILE" | "COLO_OUTPUT_JSON" | "COLO_OUTPUT_HTML" | "COLO_LOG_FILE" => {
                if value.is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            "COLO_GEO_URL" => {
                url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("COLO_URL_FILE", "Endpoint catalog file", "data/endpoints.txt"),
            ("COLO_OUTPUT_JSON", "JSON report path", "results/latency_results.json"),
            ("COLO_OUTPUT_HTML", "HTML report path", "results/latency_results.html"),
            ("COLO_LOG_FILE", "Append-only run log", "results/latency.log"),
            ("COLO_WORKERS", "Probes in flight (1-1024)", "80"),
            ("COLO_THRESHOLD_MS", "Co-location threshold in ms", "12.0"),
            ("COLO_TIMEOUT_SECONDS", "Per-probe timeout (1-60)", "4"),
            ("COLO_DNS_TIMEOUT_SECONDS", "Per-query DNS timeout (1-60)", "5"),
            ("COLO_ENRICH_TIMEOUT_SECONDS", "Per-address enrichment timeout (1-60)", "5"),
            ("COLO_PORT", "TLS port to probe", "443"),
            ("COLO_ENABLE_GEO", "IP geolocation lookups", "true"),
            ("COLO_ENABLE_CLOUD_REGION", "Reverse DNS / cloud region lookups", "true"),
            ("COLO_ENABLE_COLOR", "Enable colored output", "true"),
            ("COLO_GEO_URL", "Geolocation service base URL", "https://ipwhois.app/json"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<28} {}\n", var, description));
            help.push_str(&format!("  {:<28} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value).err().map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_env_manager_validate_env_var() {
        assert!(EnvManager::validate_env_var("COLO_WORKERS", "80").is_ok());
        assert!(EnvManager::validate_env_var("COLO_THRESHOLD_MS", "12.5").is_ok());
        assert!(EnvManager::validate_env_var("COLO_TIMEOUT_SECONDS", "4").is_ok());
        assert!(EnvManager::validate_env_var("COLO_PORT", "443").is_ok());
        assert!(EnvManager::validate_env_var("COLO_ENABLE_GEO", "false").is_ok());
        assert!(EnvManager::validate_env_var("COLO_GEO_URL", "http://127.0.0.1:8080/json").is_ok());

        assert!(EnvManager::validate_env_var("COLO_WORKERS", "0").is_err());
        assert!(EnvManager::validate_env_var("COLO_WORKERS", "1025").is_err());
        assert!(EnvManager::validate_env_var("COLO_THRESHOLD_MS", "-1").is_err());
        assert!(EnvManager::validate_env_var("COLO_DNS_TIMEOUT_SECONDS", "61").is_err());
        assert!(EnvManager::validate_env_var("COLO_PORT", "0").is_err());
        assert!(EnvManager::validate_env_var("COLO_ENABLE_COLOR", "maybe").is_err());
        assert!(EnvManager::validate_env_var("COLO_URL_FILE", " ").is_err());
        assert!(EnvManager::validate_env_var("COLO_GEO_URL", "not a url").is_err());
    }

    #[test]
    fn test_unknown_vars_are_ignored() {
        assert!(EnvManager::validate_env_var("PATH", "anything").is_ok());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();

        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("COLO_WORKERS"));
        assert!(help.contains("COLO_THRESHOLD_MS"));
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_load_missing_env_file_is_ok() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(EnvManager::load_env_file_from(&dir.path().join(".env"), false).is_ok());
    }

    #[test]
    fn test_load_env_file_sets_variables() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "COLO_TEST_ONLY_MARKER=loaded").unwrap();

        EnvManager::load_env_file_from(file.path(), false).unwrap();
        assert_eq!(std::env::var("COLO_TEST_ONLY_MARKER").unwrap(), "loaded");
        std::env::remove_var("COLO_TEST_ONLY_MARKER");
    }
}
