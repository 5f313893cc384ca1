//! Configuration parsing from the scenario file, environment and CLI arguments

use crate::{
    cli::Cli,
    config::{env::EnvManager, validation::ValidationWarning, ConfigValidator},
    error::{AppError, Result},
    logging::{LogLevel, LogSettings},
    models::BenchConfig,
    types::TargetPlanKind,
};
use std::path::PathBuf;

/// Everything a run needs, resolved once before any scenario starts
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: BenchConfig,
    pub config_path: PathBuf,
    /// Restart the fleet before every scenario
    pub restart_fleet: bool,
    /// Scenario ids to run; empty runs every enabled scenario
    pub scenario_filter: Vec<String>,
    pub skip_preflight: bool,
    pub export_csv: bool,
    pub use_color: bool,
    pub log: LogSettings,
    /// Advisory findings from validation
    pub warnings: Vec<ValidationWarning>,
}

impl RunSettings {
    /// Enabled scenarios that pass the `--scenario` filter, in configured order
    pub fn selected_scenarios(&self) -> Vec<&crate::models::NetworkScenario> {
        self.config
            .enabled_scenarios()
            .into_iter()
            .filter(|s| self.scenario_filter.is_empty() || self.scenario_filter.contains(&s.id))
            .collect()
    }
}

/// Configuration parser that layers CLI arguments over environment over file
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete run settings
    pub fn parse(&self) -> Result<RunSettings> {
        self.cli.validate().map_err(AppError::config)?;

        EnvManager::load_env_file(self.cli.debug)?;

        let config = BenchConfig::load(&self.cli.config)?;
        self.resolve(config, |key| std::env::var(key).ok())
    }

    /// Layer environment and CLI over an already loaded file
    pub fn resolve<F>(&self, mut config: BenchConfig, lookup: F) -> Result<RunSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvManager::apply_overrides_from(&mut config, lookup)?;
        self.apply_cli_overrides(&mut config);

        let warnings = ConfigValidator::validate_comprehensive(&config)?;
        self.check_scenario_filter(&config)?;

        Ok(RunSettings {
            config,
            config_path: self.cli.config.clone(),
            restart_fleet: self.cli.restart_fleet || env.restart_fleet,
            scenario_filter: self.cli.scenarios.clone(),
            skip_preflight: self.cli.skip_preflight,
            export_csv: self.cli.csv,
            use_color: self.cli.use_colors(),
            log: self.log_settings()?,
            warnings,
        })
    }

    fn apply_cli_overrides(&self, config: &mut BenchConfig) {
        if let Some(iterations) = self.cli.iterations {
            config.test_configuration.iterations = iterations;
        }

        if let Some(timeout) = self.cli.timeout {
            config.test_configuration.timeout = timeout;
        }

        if let Some(dir) = &self.cli.output_dir {
            config.test_configuration.output_directory = dir.display().to_string();
        }

        if self.cli.rotate {
            config.harness.target_plan = TargetPlanKind::Rotating;
        }
    }

    fn check_scenario_filter(&self, config: &BenchConfig) -> Result<()> {
        let unknown: Vec<&str> = self
            .cli
            .scenarios
            .iter()
            .filter(|id| !config.network_scenarios.iter().any(|s| &s.id == *id))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AppError::config(format!(
                "Unknown scenario id(s): {}",
                unknown.join(", ")
            )))
        }
    }

    fn log_settings(&self) -> Result<LogSettings> {
        let level = match (&self.cli.log_level, self.cli.debug) {
            (Some(level), _) => level.parse()?,
            (None, true) => LogLevel::Debug,
            (None, false) => LogLevel::Info,
        };

        Ok(LogSettings {
            level,
            format: self.cli.log_format.parse()?,
            use_color: self.cli.use_colors(),
        })
    }
}

/// Convenience function to load complete run settings from CLI arguments
pub fn load_config(cli: Cli) -> Result<RunSettings> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(settings: &RunSettings) -> String {
    let config = &settings.config;
    let scenarios: Vec<&str> = settings
        .selected_scenarios()
        .iter()
        .map(|s| s.id.as_str())
        .collect();

    let mut summary = Vec::new();
    summary.push(format!("Config file: {}", settings.config_path.display()));
    summary.push(format!("Run: {}", config.test_configuration.name));
    summary.push(format!("Scenarios: {}", scenarios.join(", ")));
    summary.push(format!(
        "Files: {}",
        config
            .test_files
            .iter()
            .map(|f| format!("{} ({})", f.filename, f.human_size()))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    summary.push(format!("Iterations: {}", config.iterations()));
    summary.push(format!("Timeout: {}s", config.test_configuration.timeout));
    summary.push(format!("Target plan: {:?}", config.harness.target_plan));
    summary.push(format!("Write mode: {:?}", config.harness.effective_write_mode()));
    summary.push(format!("Output directory: {}", config.test_configuration.output_directory));
    summary.push(format!("Restart fleet: {}", settings.restart_fleet));

    summary.join("\n")
}
