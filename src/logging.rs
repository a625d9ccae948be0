//! Structured logging for probe runs
//!
//! This module provides:
//! - Leveled log entries with structured fields, a per-run session id and
//!   correlation ids that tie the start and end of a run phase together
//! - An append-only log file that records every run at info level and above
//! - Specialised loggers for phases, network events and application errors

use crate::error::{AppError, ErrorContext, Result};
use crate::executor::RunSummary;
use crate::models::{Config, ProbeResult};
use crate::types::ProbeStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-domain and per-address detail
    Debug = 1,
    /// Run progress and results
    Info = 2,
    /// Something the user should look at; the run continues
    Warn = 3,
    /// A failure that ends the run
    Error = 4,
    /// Invalid configuration; nothing was probed
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }

    /// Console level implied by the verbosity flags
    pub fn for_config(config: &Config) -> Self {
        if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }
}

/// One structured log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Ties together entries of one run phase
    pub correlation_id: Option<String>,
    /// Structured fields, kept sorted for stable output
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Append-only log file shared by every logger of a run
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
    min_level: LogLevel,
}

impl FileSink {
    /// Open (or create) `path` for appending, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            min_level: LogLevel::Info,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// A started run phase; pass it back to [`Logger::end_operation`]
#[derive(Debug, Clone)]
pub struct Operation {
    name: String,
    correlation_id: String,
    started: Instant,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Leveled logger writing to stderr and, optionally, the run log file
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    name: String,
    session_id: Option<String>,
    file: Option<Arc<FileSink>>,
}

impl Logger {
    /// Logger whose console level and color follow `config`
    pub fn with_config(name: String, config: &Config) -> Self {
        Self {
            min_level: LogLevel::for_config(config),
            use_color: config.enable_color,
            name,
            session_id: None,
            file: None,
        }
    }

    /// Also append entries to `sink`
    pub fn with_file_sink(mut self, sink: Arc<FileSink>) -> Self {
        self.file = Some(sink);
        self
    }

    /// Stamp every entry with `session_id`
    pub fn with_session_id(mut self, session_id: String) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Log the start of a run phase under a fresh correlation id
    pub async fn start_operation(&self, name: &str) -> Operation {
        let operation = Operation {
            name: name.to_string(),
            correlation_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
        };
        self.info(&format!("Started {}", name))
            .correlation_id(&operation.correlation_id)
            .field("operation", name)
            .log()
            .await;
        operation
    }

    /// Log the end of a run phase with its item count and duration
    pub async fn end_operation(&self, operation: &Operation, items: usize) -> Duration {
        let elapsed = operation.started.elapsed();
        self.info(&format!(
            "Completed {}: {} items in {:.3}s",
            operation.name,
            items,
            elapsed.as_secs_f64()
        ))
        .correlation_id(&operation.correlation_id)
        .field("operation", operation.name.as_str())
        .field("items", items)
        .field("duration_ms", elapsed.as_secs_f64() * 1000.0)
        .log()
        .await;
        elapsed
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    fn to_console(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn to_file(&self, level: LogLevel) -> bool {
        self.file.as_ref().is_some_and(|sink| level >= sink.min_level)
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        let to_console = self.to_console(entry.level);
        let to_file = self.to_file(entry.level);
        if !to_console && !to_file {
            return;
        }

        if let Some(session_id) = &self.session_id {
            entry
                .fields
                .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }

        if to_file {
            if let Some(sink) = &self.file {
                sink.write_line(&Self::format_file(&entry));
            }
        }

        if to_console {
            // stderr keeps the summary on stdout clean
            let _ = writeln!(io::stderr(), "{}", self.format_console(&entry));
        }
    }

    fn format_fields(entry: &LogEntry) -> Option<String> {
        if entry.fields.is_empty() {
            return None;
        }
        let fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        Some(format!("{{{}}}", fields.join(", ")))
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            output.push_str(&format!(" [{}]", correlation_id.chars().take(8).collect::<String>()));
        }

        if let Some(fields) = Self::format_fields(entry) {
            output.push(' ');
            output.push_str(&fields);
        }

        output
    }

    /// Plain line for the log file: `<timestamp> <LEVEL> [<logger>] <message> {fields}`
    fn format_file(entry: &LogEntry) -> String {
        let mut output = format!(
            "{} {} [{}] {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level.as_str(),
            entry.logger,
            entry.message
        );
        if let Some(correlation_id) = &entry.correlation_id {
            output.push_str(&format!(" [{}]", correlation_id));
        }
        if let Some(fields) = Self::format_fields(entry) {
            output.push(' ');
            output.push_str(&fields);
        }
        output
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add error category, fatality and exit code
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal_configuration())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Specialized logger for resolution and probe events
pub struct NetworkLogger {
    logger: Logger,
}

impl NetworkLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Log the answer (or failure) for one domain
    pub async fn log_resolution(&self, domain: &str, outcome: std::result::Result<&[IpAddr], &str>) {
        match outcome {
            Ok(addresses) => {
                let addresses: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
                self.logger
                    .debug(&format!("Resolved {} to {} address(es)", domain, addresses.len()))
                    .field("domain", domain)
                    .field("addresses", addresses)
                    .log()
                    .await;
            }
            Err(reason) => {
                self.logger
                    .warn(&format!("Resolution failed for {}: {}", domain, reason))
                    .field("domain", domain)
                    .field("reason", reason)
                    .log()
                    .await;
            }
        }
    }

    /// Log one classified probe result
    pub async fn log_probe(&self, result: &ProbeResult) {
        let address = result
            .address()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());

        let (level, message) = match (result.status(), result.failure()) {
            (ProbeStatus::Unreachable, Some(failure)) => {
                let level = if failure.kind.is_expected() {
                    LogLevel::Info
                } else {
                    LogLevel::Warn
                };
                (
                    level,
                    format!("{} {} {} FAIL ({}): {}", result.name(), result.domain(), address, failure.kind, failure.detail),
                )
            }
            (status, _) => (
                LogLevel::Info,
                format!(
                    "{} {} {} {:.2}ms {}",
                    result.name(),
                    result.domain(),
                    address,
                    result.latency_ms().unwrap_or_default(),
                    status.label()
                ),
            ),
        };

        let mut builder = self
            .logger
            .log(level, &message)
            .field("constant", result.name())
            .field("domain", result.domain())
            .field("ip", &address)
            .field("status", result.status().label());
        if let Some(ms) = result.latency_ms() {
            builder = builder.field("latency_ms", ms);
        }
        if let Some(failure) = result.failure() {
            builder = builder.field("failure", failure.kind);
        }
        builder.log().await;
    }

    /// Log the end-of-run counts
    pub async fn log_summary(&self, summary: &RunSummary) {
        self.logger
            .info(&format!(
                "{}/{} IPs are COLO ({:.1}%)",
                summary.co_located,
                summary.total,
                summary.co_located_percentage()
            ))
            .field("total", summary.total)
            .field("co_located", summary.co_located)
            .field("reachable_distant", summary.reachable_distant)
            .field("unreachable", summary.unreachable)
            .field("unresolved", summary.unresolved)
            .log()
            .await;
    }
}

/// Error event logger with enhanced context
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Log an application error with full context
    pub async fn log_error(&self, error: &AppError, context: Option<&str>, correlation_id: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let level = if error.is_fatal_configuration() {
            LogLevel::Fatal
        } else {
            LogLevel::Error
        };
        let mut builder = self.logger.log(level, &message).error_info(error);

        if let Some(id) = correlation_id {
            builder = builder.correlation_id(id);
        }
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }

        builder.log().await;
    }
}

/// Creates loggers that share one session id and one log file
pub struct LoggerFactory {
    config: Config,
    session_id: String,
    file: Option<Arc<FileSink>>,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
            file: None,
        }
    }

    /// Append every logger's info-and-above entries to `path`
    pub fn with_log_file(mut self, path: &Path) -> Result<Self> {
        self.file = Some(Arc::new(FileSink::open(path)?));
        Ok(self)
    }

    /// Create a logger with a specific name
    pub fn create_logger(&self, name: &str) -> Logger {
        let mut logger = Logger::with_config(name.to_string(), &self.config).with_session_id(self.session_id.clone());
        if let Some(sink) = &self.file {
            logger = logger.with_file_sink(Arc::clone(sink));
        }
        logger
    }

    pub fn create_network_logger(&self) -> NetworkLogger {
        NetworkLogger::new(self.create_logger("NET"))
    }

    pub fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger::new(self.create_logger("ERR"))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.file.as_deref().map(FileSink::path)
    }
}
