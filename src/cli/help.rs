//! Topic help with usage examples and configuration guidance

use crate::config::env::EnvManager;
use colored::*;

/// Help text for the main screen and each `--help-topic`
pub struct HelpSystem {
    version: &'static str,
}

impl HelpSystem {
    /// Topics accepted by `--help-topic`
    pub const TOPICS: [&'static str; 5] = ["config", "env", "shaping", "examples", "output"];

    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Display the main help message with all available options
    pub fn display_main_help(&self, use_colors: bool) -> String {
        let mut help = String::new();

        help.push_str(&self.format_header(use_colors));
        help.push('\n');
        help.push_str(&self.format_usage_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_options_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_examples_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_footer(use_colors));

        help
    }

    /// Display help for one topic, `None` if the topic is unknown
    pub fn display_topic_help(&self, topic: &str, use_colors: bool) -> Option<String> {
        match topic.to_lowercase().as_str() {
            "config" | "configuration" => Some(self.format_configuration_help(use_colors)),
            "env" | "environment" => Some(self.format_environment_help(use_colors)),
            "shaping" | "network" => Some(self.format_shaping_help(use_colors)),
            "examples" => Some(self.format_examples_section(use_colors)),
            "output" | "results" => Some(self.format_output_help(use_colors)),
            _ => None,
        }
    }

    fn section(&self, title: &str, use_colors: bool) -> String {
        if use_colors {
            title.bright_green().bold().to_string()
        } else {
            title.to_string()
        }
    }

    fn format_header(&self, use_colors: bool) -> String {
        let title = "Bandwidth Bench";
        let subtitle = "Upload/download benchmark for a content-addressed storage fleet";

        if use_colors {
            format!(
                "{}\n{}\nVersion: {}\n",
                title.bright_cyan().bold(),
                subtitle.white(),
                self.version.bright_yellow()
            )
        } else {
            format!("{}\n{}\nVersion: {}\n", title, subtitle, self.version)
        }
    }

    fn format_usage_section(&self, use_colors: bool) -> String {
        let mut usage = format!("{}\n", self.section("USAGE:", use_colors));
        for pattern in [
            "bwbench [OPTIONS]",
            "bwbench --config <FILE> [OPTIONS]",
            "bwbench --help-topic <TOPIC>",
        ] {
            if use_colors {
                usage.push_str(&format!("  {}\n", pattern.bright_white()));
            } else {
                usage.push_str(&format!("  {}\n", pattern));
            }
        }
        usage
    }

    fn format_options_section(&self, use_colors: bool) -> String {
        let options = [
            OptionHelp {
                short: Some("c"),
                long: "config",
                value: "<FILE>",
                description: "Scenario configuration file (default: test-scenarios.json)",
            },
            OptionHelp {
                short: Some("n"),
                long: "iterations",
                value: "<N>",
                description: "Trials per file per scenario",
            },
            OptionHelp {
                short: Some("t"),
                long: "timeout",
                value: "<SECONDS>",
                description: "Per-call timeout for node requests",
            },
            OptionHelp {
                short: Some("o"),
                long: "output-dir",
                value: "<DIR>",
                description: "Directory for run reports",
            },
            OptionHelp {
                short: None,
                long: "scenario",
                value: "<ID>",
                description: "Run only the named scenario (repeatable)",
            },
            OptionHelp {
                short: None,
                long: "restart-fleet",
                value: "",
                description: "Restart nodes and reconnect peers before each scenario",
            },
            OptionHelp {
                short: None,
                long: "rotate",
                value: "",
                description: "Rotate upload/download nodes across all targets",
            },
            OptionHelp {
                short: None,
                long: "skip-preflight",
                value: "",
                description: "Skip the container runtime and node checks",
            },
            OptionHelp {
                short: None,
                long: "csv",
                value: "",
                description: "Export every trial as CSV next to the JSON report",
            },
            OptionHelp {
                short: None,
                long: "log-level",
                value: "<LEVEL>",
                description: "trace, debug, info, warn, error or fatal",
            },
            OptionHelp {
                short: None,
                long: "log-format",
                value: "<FORMAT>",
                description: "console, json or compact",
            },
        ];

        let mut section = format!("{}\n", self.section("OPTIONS:", use_colors));
        for option in &options {
            section.push_str(&option.format(use_colors));
            section.push('\n');
        }
        section
    }

    fn format_examples_section(&self, use_colors: bool) -> String {
        let examples = [
            ExampleHelp {
                title: "Run every enabled scenario",
                command: "bwbench --config test-scenarios.json",
                description: "Writes results/test_results_<timestamp>.json",
            },
            ExampleHelp {
                title: "Quick baseline check",
                command: "bwbench --scenario baseline --iterations 3",
                description: "Runs one scenario with three trials per file",
            },
            ExampleHelp {
                title: "Clean fleet per scenario",
                command: "RESTART_CONTAINERS=1 bwbench",
                description: "Restarts nodes and reconnects peers before each scenario",
            },
            ExampleHelp {
                title: "Spread load across the fleet",
                command: "bwbench --rotate --csv",
                description: "Rotates node pairs per trial and exports a CSV",
            },
        ];

        let mut section = format!("{}\n", self.section("EXAMPLES:", use_colors));
        for example in &examples {
            section.push_str(&example.format(use_colors));
        }
        section
    }

    fn format_footer(&self, use_colors: bool) -> String {
        let hint = format!(
            "Use --help-topic <TOPIC> for details. Topics: {}",
            Self::TOPICS.join(", ")
        );
        if use_colors {
            format!("{}\n", hint.bright_blue())
        } else {
            format!("{}\n", hint)
        }
    }

    fn format_configuration_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section("CONFIGURATION FILE", use_colors));
        help.push_str("The configuration file is JSON with these sections:\n\n");
        help.push_str("  testConfiguration  name, iterations, timeout (seconds), outputDirectory\n");
        help.push_str("  testFiles          filename, size, sizeBytes\n");
        help.push_str("  networkScenarios   id, name, bandwidth, bandwidthCommand, shapingMode,\n");
        help.push_str("                     enabled\n");
        help.push_str("  testTargets        container, apiPort, gatewayPort, role (upload/download/peer)\n");
        help.push_str("  shapingTargets     hosts reshaped one by one (default: every target)\n");
        help.push_str("  fleet              controlPlane, containers, requiredContainers, scripts\n");
        help.push_str("  harness            propagationDelayMs, settle times, progressInterval,\n");
        help.push_str("                     targetPlan (fixed/rotating), writeMode (pinned/unpinned)\n\n");
        help.push_str("Precedence: configuration file < environment < command line.\n");
        help
    }

    fn format_environment_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section("ENVIRONMENT VARIABLES", use_colors));
        help.push_str("Variables are read from the process and from a .env file.\n\n");
        for (name, description, example) in EnvManager::get_supported_env_vars() {
            if use_colors {
                help.push_str(&format!("  {:<22} {}\n", name.bright_cyan(), description));
            } else {
                help.push_str(&format!("  {:<22} {}\n", name, description));
            }
            help.push_str(&format!("  {:<22} Example: {}\n", "", example));
        }
        help
    }

    fn format_shaping_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section("NETWORK SHAPING", use_colors));
        help.push_str("Each scenario picks one shaping mode:\n\n");
        help.push_str("  unlimited   no bandwidth; any leftover shaping is cleared\n");
        help.push_str("  bulk        bandwidthCommand runs once for the whole fleet\n");
        help.push_str("              (limit-bandwidth-all.sh, limit-bandwidth-routers.sh)\n");
        help.push_str("  per-target  stop then apply on each shaping target; limits are\n");
        help.push_str("              removed after the scenario\n\n");
        help.push_str("Shaping failures are logged and the scenario still runs.\n");
        help.push_str("Bulk limits stay until the next scenario or the end of the run.\n");
        help
    }

    fn format_output_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section("OUTPUT", use_colors));
        help.push_str("The report is rewritten after each scenario and at the end:\n\n");
        help.push_str("  results/test_results_YYYYmmdd_HHMMSS.json\n\n");
        help.push_str("It holds the configuration, every trial and, once the run ends,\n");
        help.push_str("per-scenario statistics. Use --csv for a flat export of the trials.\n");
        help
    }
}

impl Default for HelpSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// One line of the options section
struct OptionHelp {
    short: Option<&'static str>,
    long: &'static str,
    value: &'static str,
    description: &'static str,
}

impl OptionHelp {
    fn format(&self, use_colors: bool) -> String {
        let mut option_str = match self.short {
            Some(short) if use_colors => format!("  {}, ", format!("-{}", short).bright_cyan()),
            Some(short) => format!("  -{}, ", short),
            None => "      ".to_string(),
        };

        let long_with_value = if self.value.is_empty() {
            format!("--{}", self.long)
        } else {
            format!("--{} {}", self.long, self.value)
        };

        if use_colors {
            option_str.push_str(&format!(
                "{:<28} {}",
                long_with_value.bright_cyan(),
                self.description.white()
            ));
        } else {
            option_str.push_str(&format!("{:<28} {}", long_with_value, self.description));
        }

        option_str
    }
}

struct ExampleHelp {
    title: &'static str,
    command: &'static str,
    description: &'static str,
}

impl ExampleHelp {
    fn format(&self, use_colors: bool) -> String {
        if use_colors {
            format!(
                "  {}:\n    {}\n    {}\n",
                self.title.bright_yellow().bold(),
                self.command.bright_white(),
                self.description.bright_blue().italic()
            )
        } else {
            format!(
                "  {}:\n    {}\n    {}\n",
                self.title, self.command, self.description
            )
        }
    }
}
