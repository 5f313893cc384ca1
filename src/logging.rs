//! Structured logging for the benchmark harness
//!
//! Progress, warnings, and per-trial outcomes stream through named loggers
//! that share a session id. Entries render as human-readable console lines,
//! JSON objects for log aggregators, or a compact single-line form.

use crate::error::{AppError, Result};
use crate::models::metrics::TrialResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
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
            LogLevel::Trace => "\x1b[37m",
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
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(AppError::parse(format!("Invalid log format: {}", s))),
        }
    }
}

/// Output settings shared by every logger of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub use_color: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Console,
            use_color: true,
        }
    }
}

impl LogSettings {
    /// Only fatal entries; used by tests and embedding callers
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Fatal,
            format: LogFormat::Compact,
            use_color: false,
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub logger: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Shared logging context for session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: BTreeMap<String, serde_json::Value>,
}

/// Named logger. Clones share the session context.
#[derive(Debug, Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    pub fn with_settings(name: impl Into<String>, settings: LogSettings) -> Self {
        Self {
            min_level: settings.level,
            use_color: settings.use_color,
            format: settings.format,
            name: name.into(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Logger that only prints fatal entries
    pub fn quiet(name: impl Into<String>) -> Self {
        Self::with_settings(name, LogSettings::quiet())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Add a field to every subsequent entry
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key.to_string(), json_value);
        }
    }

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

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry
                .fields
                .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        for (key, value) in &context.context_fields {
            entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        drop(context);

        let output = self.render(&entry);

        // Warnings and errors go to stderr so stdout stays the progress stream
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
            LogFormat::Compact => self.format_compact(entry),
        }
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

        let fields: Vec<String> = entry
            .fields
            .iter()
            .filter(|(k, _)| k.as_str() != "session_id")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        if !fields.is_empty() {
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}",
                entry.message
            ),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
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
                fields: BTreeMap::new(),
            },
        }
    }

    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Attach the measured fields of a trial
    pub fn trial(self, result: &TrialResult) -> Self {
        let builder = self
            .field("scenario", &result.scenario)
            .field("file", &result.file)
            .field("iteration", result.iteration)
            .field("success", result.success)
            .field("upload_s", round3(result.upload_time))
            .field("download_s", round3(result.download_time))
            .field("upload_mbps", round3(result.upload_mbps()))
            .field("download_mbps", round3(result.download_mbps()));

        let builder = if result.upload_node.is_empty() {
            builder
        } else {
            builder
                .field("upload_node", &result.upload_node)
                .field("download_node", &result.download_node)
        };

        match &result.error {
            Some(error) => builder.field("error", error),
            None => builder,
        }
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal())
            .field("error_exit_code", error.exit_code())
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }

    #[cfg(test)]
    fn into_entry(self) -> LogEntry {
        self.entry
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Mints named loggers sharing one session id
pub struct LoggerFactory {
    settings: LogSettings,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(settings: LogSettings) -> Self {
        Self {
            settings,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_settings(name, self.settings);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn settings(&self) -> LogSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{NetworkScenario, TestFile};
    use std::str::FromStr;
    use std::time::Duration;

    fn entry(level: LogLevel) -> LogEntry {
        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), serde_json::Value::String("value".to_string()));
        LogEntry {
            timestamp: Utc::now(),
            level,
            message: "Applied 10mbit".to_string(),
            logger: "SHAPE".to_string(),
            fields,
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("Console").unwrap(), LogFormat::Console);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_would_log() {
        let logger = Logger::with_settings(
            "TEST",
            LogSettings {
                level: LogLevel::Warn,
                ..LogSettings::default()
            },
        );
        assert!(!logger.would_log(LogLevel::Info));
        assert!(logger.would_log(LogLevel::Warn));
        assert!(Logger::quiet("Q").would_log(LogLevel::Fatal));
        assert!(!Logger::quiet("Q").would_log(LogLevel::Error));
    }

    #[test]
    fn test_formats() {
        let logger = Logger::with_settings(
            "SHAPE",
            LogSettings {
                use_color: false,
                ..LogSettings::default()
            },
        );
        let console = logger.format_console(&entry(LogLevel::Info));
        assert!(console.contains(" INFO [SHAPE] Applied 10mbit"));
        assert!(console.contains("key=\"value\""));

        let json = logger.format_json(&entry(LogLevel::Warn));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["level"], "Warn");
        assert_eq!(parsed["fields"]["key"], "value");

        let compact = logger.format_compact(&entry(LogLevel::Error));
        assert!(compact.contains("E SHAPE: Applied 10mbit"));
    }

    #[tokio::test]
    async fn test_clones_share_context() {
        let logger = Logger::quiet("BENCH");
        let clone = logger.clone();
        logger.add_context_field("run", "Bandwidth").await;
        let context = clone.context.read().await;
        assert_eq!(context.context_fields["run"], "Bandwidth");
    }

    #[test]
    fn test_trial_fields() {
        let file = TestFile::new("test1m.dat", 1_048_576);
        let scenario = NetworkScenario::unlimited("baseline", "No Limit");
        let mut result = TrialResult::begin(2, &file, &scenario);
        result.record_upload(Duration::from_millis(1234));
        let result = result.fail("Transport error: timed out");

        let logger = Logger::quiet("TRIAL");
        let entry = logger.info("Trial done").trial(&result).into_entry();
        assert_eq!(entry.fields["iteration"], 2);
        assert_eq!(entry.fields["upload_s"], 1.234);
        assert_eq!(entry.fields["success"], false);
        assert_eq!(entry.fields["error"], "Transport error: timed out");
        assert!(!entry.fields.contains_key("upload_node"));
    }

    #[test]
    fn test_error_info_fields() {
        let logger = Logger::quiet("TEST");
        let entry = logger
            .warn("Shaping failed")
            .error_info(&AppError::shaping("exit 1"))
            .into_entry();
        assert_eq!(entry.fields["error_category"], "SHAPING");
        assert_eq!(entry.fields["error_fatal"], false);
    }

    #[tokio::test]
    async fn test_logger_factory() {
        let factory = LoggerFactory::new(LogSettings::quiet());
        let logger = factory.create_logger("ORCH").await;
        assert_eq!(logger.name(), "ORCH");
        assert!(!factory.session_id().is_empty());

        let context = logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some(factory.session_id()));
    }
}
