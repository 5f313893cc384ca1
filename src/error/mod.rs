//! Error handling for the bandwidth benchmark harness

use thiserror::Error;

/// Error taxonomy for the harness.
///
/// Only [`AppError::Config`] is fatal to a run. Every per-trial failure
/// (`Transport`, `Protocol`, `SizeMismatch`, `Generation`) is captured into the
/// trial's error description, `Shaping` degrades a scenario, and `Reclaim` is
/// only ever logged.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing/ambiguous targets, unreachable control plane, malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failure or timeout on a node call
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success status or a write response without an identifier
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Read byte count differs from the declared size
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Random source failure while building a payload
    #[error("Payload generation error: {0}")]
    Generation(String),

    /// External shaping script failure
    #[error("Shaping error: {0}")]
    Shaping(String),

    /// Unpin / garbage-collect failure
    #[error("Reclaim error: {0}")]
    Reclaim(String),

    /// I/O errors (report files, process spawning)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (JSON, CSV, numbers)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a new size mismatch error
    pub fn size_mismatch(expected: u64, actual: u64) -> Self {
        Self::SizeMismatch { expected, actual }
    }

    /// Create a new payload generation error
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::Generation(message.into())
    }

    /// Create a new shaping error
    pub fn shaping<S: Into<String>>(message: S) -> Self {
        Self::Shaping(message.into())
    }

    /// Create a new reclaim error
    pub fn reclaim<S: Into<String>>(message: S) -> Self {
        Self::Reclaim(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Transport(_) => "TRANSPORT",
            Self::Protocol(_) => "PROTOCOL",
            Self::SizeMismatch { .. } => "SIZE",
            Self::Generation(_) => "PAYLOAD",
            Self::Shaping(_) => "SHAPING",
            Self::Reclaim(_) => "RECLAIM",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether this error belongs to a single trial and is recorded on it
    pub fn is_trial_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Protocol(_) | Self::SizeMismatch { .. } | Self::Generation(_)
        )
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) => 1,
            Self::Transport(_) | Self::Protocol(_) | Self::SizeMismatch { .. } => 2,
            Self::Shaping(_) | Self::Reclaim(_) => 3,
            Self::Io(_) => 5,
            Self::Generation(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Transport(_) | Self::Protocol(_) | Self::SizeMismatch { .. } => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Shaping(_) | Self::Reclaim(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::Generation(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::config(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<csv::Error> for AppError {
    fn from(error: csv::Error) -> Self {
        Self::io(format!("CSV error: {}", error))
    }
}

// Timeouts map to Transport like any other I/O failure
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_status() {
            Self::protocol(error.to_string())
        } else {
            Self::transport(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::fmt::Error> for AppError {
    fn from(error: std::fmt::Error) -> Self {
        Self::internal(format!("Formatting error: {}", error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error, keeping its category
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original = e.into();
            let context = f();
            match original {
                AppError::Config(msg) => AppError::Config(format!("{}: {}", context, msg)),
                AppError::Io(msg) => AppError::Io(format!("{}: {}", context, msg)),
                AppError::Parse(msg) => AppError::Parse(format!("{}: {}", context, msg)),
                other => AppError::internal(format!("{}: {}", context, other)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}
