//! Advisory checks on a configuration that already passed `Config::validate`

use crate::{error::Result, models::Config};
use std::time::Duration;

/// Worker counts above this tend to hit default file descriptor limits
const HIGH_WORKER_COUNT: usize = 512;

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Info => "INFO",
            ValidationLevel::Warning => "WARNING",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ValidationLevel::Info => "\x1b[36m",
            ValidationLevel::Warning => "\x1b[33m",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            format!("{}[{}]\x1b[0m {}", self.level.color(), self.level.as_str(), self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Configuration validator with advisory rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run `Config::validate` and collect advisory warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_threshold(config));
        warnings.extend(Self::validate_concurrency(config));
        warnings.extend(Self::validate_port(config));
        warnings.extend(Self::validate_outputs(config));
        Ok(warnings)
    }

    fn validate_threshold(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        // A handshake that completes is always faster than the probe timeout
        if config.threshold() >= config.probe_timeout() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Threshold {} ms is not below the {} s probe timeout; every reachable address will be COLO",
                    config.threshold_ms, config.timeout_seconds
                ),
            ));
        }

        if config.threshold() < Duration::from_millis(1) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Threshold {} ms is below 1 ms; only same-rack endpoints can qualify",
                    config.threshold_ms
                ),
            ));
        }

        warnings
    }

    fn validate_concurrency(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.workers > HIGH_WORKER_COUNT {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "{} workers may exceed the open file limit; consider raising `ulimit -n`",
                    config.workers
                ),
            ));
        }

        warnings
    }

    fn validate_port(config: &Config) -> Option<ValidationWarning> {
        (config.port != crate::defaults::DEFAULT_PORT).then(|| {
            ValidationWarning::new(
                ValidationLevel::Info,
                format!("Probing non-standard TLS port {}", config.port),
            )
        })
    }

    fn validate_outputs(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.output_json == config.output_html {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "JSON and HTML reports share the path {}; the HTML report will overwrite the JSON one",
                    config.output_json.display()
                ),
            ));
        }

        if config.log_file == config.output_json || config.log_file == config.output_html {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Log file {} is also a report path",
                    config.log_file.display()
                ),
            ));
        }

        warnings
    }
}

/// Convenience wrapper around [`ConfigValidator::validate_comprehensive`]
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
