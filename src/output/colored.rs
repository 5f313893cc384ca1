//! Colored formatter implementation with terminal color support

use super::formatter::{mean_mbps, FormattingOptions, OutputFormatter, RunOverview};
use crate::{
    error::Result,
    models::metrics::{FileSummary, ScenarioSummary},
};
use bytesize::ByteSize;
use colored::*;
use std::fmt::Write as _;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self {
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    /// Success rate colored by how much of the scenario survived
    fn format_rate_colored(&self, rate: f64) -> ColoredString {
        let color = if rate >= 95.0 {
            self.color_scheme.success
        } else if rate >= 80.0 {
            self.color_scheme.warning
        } else {
            self.color_scheme.error
        };
        self.colorize(&format!("{:.1}%", rate), color)
    }

    fn format_file(&self, output: &mut String, file: &FileSummary) -> std::fmt::Result {
        writeln!(
            output,
            "  {} {}",
            self.bold(&file.file),
            self.colorize(
                &format!("({})", ByteSize::b(file.file_size)),
                self.color_scheme.muted
            )
        )?;
        writeln!(
            output,
            "    Success rate: {} ({}/{})",
            self.format_rate_colored(file.success_rate),
            file.successes,
            file.attempts
        )?;
        if file.successes == 0 {
            return writeln!(
                output,
                "    {}",
                self.colorize("No successful trials", self.color_scheme.error)
            );
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
            "    Throughput: {} {}",
            self.colorize(
                &format!("↑{:.1} Mbps,", mean_mbps(file, file.upload_time.mean)),
                self.color_scheme.info
            ),
            self.colorize(
                &format!("↓{:.1} Mbps", mean_mbps(file, file.download_time.mean)),
                self.color_scheme.info
            )
        )
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let rule = "=".repeat(self.options.rule_width);
        Ok(format!(
            "{}\n{}\n{}",
            self.colorize(&rule, self.color_scheme.header),
            self.bold(title),
            self.colorize(&rule, self.color_scheme.header)
        ))
    }

    fn format_run_overview(&self, overview: &RunOverview) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "Run: {}", self.bold(&overview.name))?;
        writeln!(output, "Scenarios: {}", overview.scenarios)?;
        writeln!(
            output,
            "Trials: {} ({} successful, {})",
            overview.trials,
            overview.successful,
            self.format_rate_colored(overview.success_rate())
        )?;
        write!(output, "Completed in {:.2} seconds", overview.runtime_secs)?;
        if let Some(path) = &overview.report_path {
            write!(
                output,
                "\nResults saved to: {}",
                self.colorize(path, self.color_scheme.info)
            )?;
        }
        Ok(output)
    }

    fn format_scenario_summary(&self, summary: &ScenarioSummary) -> Result<String> {
        let mut output = String::new();
        writeln!(
            output,
            "{} {}",
            self.colorize("Scenario:", self.color_scheme.header),
            self.bold(&summary.scenario_name)
        )?;
        writeln!(output, "Bandwidth: {}", summary.bandwidth)?;
        writeln!(
            output,
            "{}",
            self.colorize(&"-".repeat(40), self.color_scheme.muted)
        )?;
        for file in &summary.files {
            self.format_file(&mut output, file)?;
        }
        Ok(output.trim_end().to_string())
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.colorize("⚠", self.color_scheme.warning),
            self.colorize(warning, self.color_scheme.warning)
        ))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.colorize("✓", self.color_scheme.success),
            message
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::sample_summary;

    fn plain_colored() -> ColoredFormatter {
        ColoredFormatter::new(FormattingOptions {
            enable_color: false,
            rule_width: 60,
        })
    }

    #[test]
    fn test_disabled_color_matches_plain_content() {
        let output = plain_colored()
            .format_scenario_summary(&sample_summary())
            .unwrap();
        assert!(output.contains("Scenario: 10 Mbit"));
        assert!(output.contains("Success rate: 75.0% (3/4)"));
        assert!(output.contains("↑8.0 Mbps,"));
        assert!(!output.contains("\u{1b}["));
    }

    #[test]
    fn test_warning_and_success_markers() {
        let formatter = plain_colored();
        assert!(formatter
            .format_warning("Shaping failed")
            .unwrap()
            .contains("Shaping failed"));
        assert!(formatter.format_success("Done").unwrap().starts_with("✓"));
    }
}
