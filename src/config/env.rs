//! Environment variable handling and .env file management

use crate::{
    error::{AppError, Result},
    models::BenchConfig,
};
use std::path::Path;

pub const ENV_CONFIG: &str = "BWBENCH_CONFIG";
pub const ENV_ITERATIONS: &str = "BWBENCH_ITERATIONS";
pub const ENV_TIMEOUT: &str = "BWBENCH_TIMEOUT";
pub const ENV_OUTPUT_DIR: &str = "BWBENCH_OUTPUT_DIR";
pub const ENV_RESTART: &str = "RESTART_CONTAINERS";

/// Values taken from the environment that are not part of the configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `RESTART_CONTAINERS=1`
    pub restart_fleet: bool,
}

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using configuration file and CLI arguments");
        }

        Ok(())
    }

    /// Merge process environment into the configuration
    pub fn apply_env_overrides(config: &mut BenchConfig) -> Result<EnvOverrides> {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Merge variables from `lookup` into the configuration
    pub fn apply_overrides_from<F>(config: &mut BenchConfig, lookup: F) -> Result<EnvOverrides>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                Some(raw) if !raw.trim().is_empty() => {
                    let raw = raw.trim().to_string();
                    Self::validate_env_var(key, &raw)?;
                    Ok(Some(raw))
                }
                _ => Ok(None),
            }
        };

        if let Some(iterations) = value(ENV_ITERATIONS)? {
            config.test_configuration.iterations = iterations.parse()?;
        }
        if let Some(timeout) = value(ENV_TIMEOUT)? {
            config.test_configuration.timeout = timeout.parse()?;
        }
        if let Some(dir) = value(ENV_OUTPUT_DIR)? {
            config.test_configuration.output_directory = dir;
        }

        Ok(EnvOverrides {
            restart_fleet: value(ENV_RESTART)?.as_deref() == Some("1"),
        })
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Bandwidth Bench Configuration
#
# Values here override the scenario configuration file and are themselves
# overridden by command-line arguments.

# Scenario configuration file
# BWBENCH_CONFIG=test-scenarios.json

# Trials per file per scenario
# BWBENCH_ITERATIONS=10

# Per-call timeout in seconds
# BWBENCH_TIMEOUT=300

# Directory for run reports
# BWBENCH_OUTPUT_DIR=results

# Restart the node fleet and reconnect peers before each scenario
# RESTART_CONTAINERS=1
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            ENV_ITERATIONS => {
                let count: u32 = value.parse().map_err(|e| {
                    AppError::config(format!("Invalid {} value '{}': {}", key, value, e))
                })?;
                if count == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            ENV_TIMEOUT => {
                let timeout: u64 = value.parse().map_err(|e| {
                    AppError::config(format!("Invalid {} value '{}': {}", key, value, e))
                })?;
                if timeout == 0 || timeout > crate::defaults::MAX_TIMEOUT_SECS {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}",
                        key,
                        crate::defaults::MAX_TIMEOUT_SECS,
                        timeout
                    )));
                }
            }
            ENV_RESTART => {
                if value != "0" && value != "1" {
                    return Err(AppError::config(format!(
                        "{} must be 0 or 1, got: {}",
                        key, value
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            (ENV_CONFIG, "Scenario configuration file", "test-scenarios.json"),
            (ENV_ITERATIONS, "Trials per file per scenario", "10"),
            (ENV_TIMEOUT, "Per-call timeout in seconds", "300"),
            (ENV_OUTPUT_DIR, "Directory for run reports", "results"),
            (ENV_RESTART, "Restart the fleet before each scenario (0/1)", "1"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<20} {}\n", var, description));
            help.push_str(&format!("  {:<20} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables and .env file\n");
        help.push_str("  3. Configuration file\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, value.trim())
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}
