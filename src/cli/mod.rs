//! Command-line interface module with topic help

pub mod help;

pub use help::HelpSystem;

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Bandwidth Bench - upload/download benchmark for a content-addressed storage fleet
#[derive(Parser, Debug, Clone)]
#[command(name = "bwbench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Scenario configuration file
    #[arg(
        short,
        long,
        env = "BWBENCH_CONFIG",
        default_value = crate::defaults::DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Trials per file per scenario (overrides the configuration file)
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Per-call timeout in seconds (overrides the configuration file)
    #[arg(short, long, value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Directory for run reports (overrides the configuration file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Restart the node fleet and reconnect peers before every scenario
    #[arg(long)]
    pub restart_fleet: bool,

    /// Rotate upload/download nodes across every configured target
    #[arg(long)]
    pub rotate: bool,

    /// Run only this scenario id (can be used multiple times)
    #[arg(long = "scenario", value_name = "ID", action = ArgAction::Append)]
    pub scenarios: Vec<String>,

    /// Skip the container runtime and node checks
    #[arg(long)]
    pub skip_preflight: bool,

    /// Also export every trial as CSV next to the JSON report
    #[arg(long)]
    pub csv: bool,

    /// Minimum log level (trace, debug, info, warn, error, fatal)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format (console, json, compact)
    #[arg(long, value_name = "FORMAT", default_value = "console")]
    pub log_format: String,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Show help for specific topic (config, env, shaping, examples, output)
    #[arg(long, value_name = "TOPIC")]
    pub help_topic: Option<String>,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.iterations == Some(0) {
            return Err("--iterations must be greater than 0".to_string());
        }

        if let Some(level) = &self.log_level {
            level
                .parse::<crate::logging::LogLevel>()
                .map_err(|e| format!("Invalid --log-level: {}", e))?;
        }

        self.log_format
            .parse::<crate::logging::LogFormat>()
            .map_err(|e| format!("Invalid --log-format: {}", e))?;

        if self.scenarios.iter().any(|id| id.trim().is_empty()) {
            return Err("--scenario requires a non-empty id".to_string());
        }

        Ok(())
    }

    /// Check if help should be displayed for a specific topic
    pub fn should_show_topic_help(&self) -> bool {
        self.help_topic.is_some()
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Display help for the specified topic or main help
    pub fn display_help(&self) -> String {
        let help_system = HelpSystem::new();
        let use_colors = self.use_colors();

        if let Some(topic) = &self.help_topic {
            help_system
                .display_topic_help(topic, use_colors)
                .unwrap_or_else(|| {
                    format!(
                        "Unknown help topic: '{}'\n\nAvailable topics: {}\n\n{}",
                        topic,
                        HelpSystem::TOPICS.join(", "),
                        help_system.display_main_help(use_colors)
                    )
                })
        } else {
            help_system.display_main_help(use_colors)
        }
    }

    /// Get flag summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command-line Overrides:\n");
        summary.push_str(&format!("  Config file: {}\n", self.config.display()));
        if let Some(iterations) = self.iterations {
            summary.push_str(&format!("  Iterations: {}\n", iterations));
        }
        if let Some(timeout) = self.timeout {
            summary.push_str(&format!("  Timeout: {}s\n", timeout));
        }
        if let Some(dir) = &self.output_dir {
            summary.push_str(&format!("  Output directory: {}\n", dir.display()));
        }
        if !self.scenarios.is_empty() {
            summary.push_str(&format!("  Scenarios: {}\n", self.scenarios.join(", ")));
        }
        summary.push_str(&format!("  Restart fleet: {}\n", self.restart_fleet));
        summary.push_str(&format!("  Rotate nodes: {}\n", self.rotate));
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));

        summary
    }
}

/// Parse a timeout in whole seconds
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::defaults::MAX_TIMEOUT_SECS {
                Err(format!(
                    "Duration cannot exceed {} seconds",
                    crate::defaults::MAX_TIMEOUT_SECS
                ))
            } else {
                Ok(secs)
            }
        })
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

    cfg!(unix)
}
