//! Output formatting, display, and report persistence
//!
//! This module renders the end-of-run summary, in color or plain text, and
//! persists run reports as JSON checkpoints and optional CSV exports.

mod colored;
mod formatter;
pub mod report;

pub use colored::{ColorScheme, ColoredFormatter};
pub use formatter::{FormattingOptions, OutputFormatter, PlainFormatter, RunOverview};
pub use report::ReportWriter;

use crate::{error::Result, models::metrics::ScenarioSummary};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support
    pub fn create_formatter(enable_color: bool) -> Box<dyn OutputFormatter + Send + Sync> {
        let options = FormattingOptions {
            enable_color,
            ..FormattingOptions::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter + Send + Sync> {
        Self::create_formatter(false)
    }
}

/// Renders the final cross-scenario summary
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter + Send + Sync>,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn OutputFormatter + Send + Sync>) -> Self {
        Self { formatter }
    }

    /// Header, run totals, then every scenario's per-file statistics
    pub fn display_summary(
        &self,
        overview: &RunOverview,
        scenarios: &[ScenarioSummary],
    ) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.formatter.format_header("Test Summary")?);
        output.push('\n');
        output.push_str(&self.formatter.format_run_overview(overview)?);
        output.push('\n');

        if scenarios.is_empty() {
            output.push('\n');
            output.push_str(&self.formatter.format_warning("No trials were run")?);
            output.push('\n');
        }

        for scenario in scenarios {
            output.push('\n');
            output.push_str(&self.formatter.format_scenario_summary(scenario)?);
            output.push('\n');
        }

        Ok(output)
    }

    pub fn display_warning(&self, warning: &str) -> Result<String> {
        self.formatter.format_warning(warning)
    }

    pub fn display_success(&self, message: &str) -> Result<String> {
        self.formatter.format_success(message)
    }
}
