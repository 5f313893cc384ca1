//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation.

use crate::{
    error::Result,
    models::metrics::{throughput_mbps, FileSummary, ScenarioSummary},
};
use bytesize::ByteSize;
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format the run-wide totals
    fn format_run_overview(&self, overview: &RunOverview) -> Result<String>;

    /// Format one scenario with its per-file statistics
    fn format_scenario_summary(&self, summary: &ScenarioSummary) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Run-wide totals shown above the per-scenario summary
#[derive(Debug, Clone, PartialEq)]
pub struct RunOverview {
    pub name: String,
    pub scenarios: usize,
    pub trials: usize,
    pub successful: usize,
    pub runtime_secs: f64,
    pub report_path: Option<String>,
}

impl RunOverview {
    pub fn success_rate(&self) -> f64 {
        crate::stats::success_rate(self.successful, self.trials)
    }
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Width of header rules
    pub rule_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            rule_width: 60,
        }
    }
}

/// Effective rate of a mean duration, `0` when nothing succeeded
pub(crate) fn mean_mbps(file: &FileSummary, mean_secs: f64) -> f64 {
    throughput_mbps(file.file_size, mean_secs)
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    fn rule(&self, ch: char) -> String {
        ch.to_string().repeat(self.options.rule_width)
    }

    fn format_file(&self, output: &mut String, file: &FileSummary) -> std::fmt::Result {
        writeln!(
            output,
            "  File: {} ({})",
            file.file,
            ByteSize::b(file.file_size)
        )?;
        writeln!(
            output,
            "    Success rate: {:.1}% ({}/{})",
            file.success_rate, file.successes, file.attempts
        )?;
        if file.successes == 0 {
            return writeln!(output, "    No successful trials");
        }
        writeln!(
            output,
            "    Avg upload: {:.2}s (±{:.2}s)",
            file.upload_time.mean, file.upload_time.std_dev
        )?;
        writeln!(
            output,
            "    Avg download: {:.2}s (±{:.2}s)",
            file.download_time.mean, file.download_time.std_dev
        )?;
        writeln!(
            output,
            "    Throughput: ↑{:.1} Mbps, ↓{:.1} Mbps",
            mean_mbps(file, file.upload_time.mean),
            mean_mbps(file, file.download_time.mean)
        )
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let rule = self.rule('=');
        Ok(format!("{}\n{}\n{}", rule, title, rule))
    }

    fn format_run_overview(&self, overview: &RunOverview) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "Run: {}", overview.name)?;
        writeln!(output, "Scenarios: {}", overview.scenarios)?;
        writeln!(
            output,
            "Trials: {} ({} successful, {:.1}%)",
            overview.trials,
            overview.successful,
            overview.success_rate()
        )?;
        write!(output, "Completed in {:.2} seconds", overview.runtime_secs)?;
        if let Some(path) = &overview.report_path {
            write!(output, "\nResults saved to: {}", path)?;
        }
        Ok(output)
    }

    fn format_scenario_summary(&self, summary: &ScenarioSummary) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "Scenario: {}", summary.scenario_name)?;
        writeln!(output, "Bandwidth: {}", summary.bandwidth)?;
        writeln!(output, "{}", "-".repeat(40))?;
        for file in &summary.files {
            self.format_file(&mut output, file)?;
        }
        Ok(output.trim_end().to_string())
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("Warning: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::sample_summary;

    #[test]
    fn test_plain_scenario_summary() {
        let formatter = PlainFormatter::new(FormattingOptions::default());
        let output = formatter.format_scenario_summary(&sample_summary()).unwrap();

        assert!(output.contains("Scenario: 10 Mbit"));
        assert!(output.contains("Bandwidth: 10mbit"));
        assert!(output.contains("Success rate: 75.0% (3/4)"));
        assert!(output.contains("Avg upload: 1.00s (±0.01s)"));
        assert!(output.contains("↑8.0 Mbps, ↓16.0 Mbps"));
        assert!(output.contains("No successful trials"));
    }

    #[test]
    fn test_plain_overview() {
        let formatter = PlainFormatter::new(FormattingOptions::default());
        let overview = RunOverview {
            name: "IPFS Bandwidth Test".to_string(),
            scenarios: 2,
            trials: 10,
            successful: 9,
            runtime_secs: 12.5,
            report_path: Some("results/test_results_20240101_000000.json".to_string()),
        };
        let output = formatter.format_run_overview(&overview).unwrap();

        assert!(output.contains("Trials: 10 (9 successful, 90.0%)"));
        assert!(output.contains("Completed in 12.50 seconds"));
        assert!(output.contains("test_results_20240101_000000.json"));
    }

    #[test]
    fn test_header_rule() {
        let formatter = PlainFormatter::new(FormattingOptions {
            enable_color: false,
            rule_width: 5,
        });
        assert_eq!(formatter.format_header("Hi").unwrap(), "=====\nHi\n=====");
    }
}
