//! Advisory checks on a configuration that already passed hard validation

use crate::{
    error::Result,
    models::{BenchConfig, NetworkScenario, TestFile},
    types::TargetPlanKind,
};
use bytesize::ByteSize;
use colored::*;
use std::collections::HashSet;

/// Payloads above this size are held in memory twice per trial
const LARGE_PAYLOAD_BYTES: u64 = 1024 * 1024 * 1024;

/// Relative tolerance between a size label and `sizeBytes`
const SIZE_LABEL_TOLERANCE: f64 = 0.10;

/// Comprehensive configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run hard validation, then collect advisory warnings
    pub fn validate_comprehensive(config: &BenchConfig) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_scenarios(&config.network_scenarios));
        warnings.extend(Self::validate_files(&config.test_files));
        warnings.extend(Self::validate_targets(config));
        warnings.extend(Self::validate_workload(config));

        Ok(warnings)
    }

    fn validate_scenarios(scenarios: &[NetworkScenario]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if scenarios.iter().all(|s| !s.enabled) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "No enabled network scenarios; the run will produce an empty report".to_string(),
            ));
        }

        for scenario in scenarios.iter().filter(|s| s.enabled) {
            if scenario.is_constrained() && scenario.bandwidth_command.trim().is_empty() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Scenario '{}' sets bandwidth {} but no command; shaping will fail and trials run unconstrained",
                        scenario.id,
                        scenario.bandwidth_label()
                    ),
                ));
            }
            if !scenario.is_constrained() && !scenario.bandwidth_command.trim().is_empty() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!(
                        "Scenario '{}' has a command but no bandwidth; the command is ignored",
                        scenario.id
                    ),
                ));
            }
        }

        warnings
    }

    fn validate_files(files: &[TestFile]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let mut names = HashSet::new();

        for file in files {
            if !names.insert(file.filename.as_str()) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Test file '{}' is listed twice; its statistics will be merged",
                        file.filename
                    ),
                ));
            }

            if file.size_bytes > LARGE_PAYLOAD_BYTES {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Test file '{}' is {}; each trial holds the payload in memory",
                        file.filename,
                        ByteSize::b(file.size_bytes)
                    ),
                ));
            }

            if let Some(label) = &file.size {
                match label.trim().parse::<ByteSize>() {
                    Ok(declared) if !Self::size_label_matches(declared.as_u64(), file.size_bytes) => {
                        warnings.push(ValidationWarning::new(
                            ValidationLevel::Warning,
                            format!(
                                "Test file '{}' is labelled {} but sizeBytes is {}",
                                file.filename, label, file.size_bytes
                            ),
                        ));
                    }
                    Ok(_) => {}
                    Err(_) => warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("Test file '{}' has an unreadable size label '{}'", file.filename, label),
                    )),
                }
            }
        }

        warnings
    }

    /// Labels like `1MB` are read as decimal; configurations often mean binary
    fn size_label_matches(declared: u64, actual: u64) -> bool {
        if declared == 0 || actual == 0 {
            return declared == actual;
        }
        let ratio = declared as f64 / actual as f64;
        (1.0 - ratio).abs() <= SIZE_LABEL_TOLERANCE
    }

    fn validate_targets(config: &BenchConfig) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let addresses: HashSet<&str> = config
            .test_targets
            .iter()
            .map(|t| t.address.as_str())
            .collect();

        if addresses.len() < config.test_targets.len() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Several test targets share an address".to_string(),
            ));
        }

        for target in &config.shaping_targets {
            if !addresses.contains(target.as_str()) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Shaping target '{}' is not a test target", target),
                ));
            }
        }

        if config.harness.target_plan == TargetPlanKind::Rotating
            && config.harness.write_mode == Some(crate::types::WriteMode::Unpinned)
        {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Rotating targets with unpinned writes; a garbage-collect sweep may drop content before it is read".to_string(),
            ));
        }

        warnings
    }

    fn validate_workload(config: &BenchConfig) -> Vec<ValidationWarning> {
        let trials = config.enabled_scenarios().len() as u64
            * config.test_files.len() as u64
            * config.iterations() as u64;

        if trials > 10_000 {
            vec![ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Run schedules {} trials and may take a very long time", trials),
            )]
        } else {
            Vec::new()
        }
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            format!(
                "[{}] {}",
                self.level.as_str().color(self.level.color()).bold(),
                self.message
            )
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &BenchConfig) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(scenarios: &str, files: &str) -> BenchConfig {
        BenchConfig::from_json_str(&format!(
            r#"{{"testConfiguration":{{"name":"t","iterations":2}},
                "testFiles":{},
                "networkScenarios":{},
                "testTargets":[
                    {{"container":"ipfs-org1","role":"upload","apiPort":5001}},
                    {{"container":"ipfs-org2","role":"download","apiPort":5001}}
                ]}}"#,
            files, scenarios
        ))
        .unwrap()
    }

    const ONE_FILE: &str = r#"[{"filename":"test1m.dat","size":"1MB","sizeBytes":1048576}]"#;
    const BASELINE: &str = r#"[{"id":"baseline","name":"No Limit"}]"#;

    fn messages(warnings: &[ValidationWarning]) -> Vec<&str> {
        warnings.iter().map(|w| w.message.as_str()).collect()
    }

    #[test]
    fn test_validation_warning() {
        let warning = ValidationWarning::new(ValidationLevel::Warning, "Test warning message".to_string());
        assert_eq!(warning.level, ValidationLevel::Warning);
        assert_eq!(warning.format(false), "[WARNING] Test warning message");
    }

    #[test]
    fn test_clean_configuration_has_no_warnings() {
        let warnings = validate_config(&config(BASELINE, ONE_FILE)).unwrap();
        assert!(warnings.is_empty(), "unexpected: {:?}", messages(&warnings));
    }

    #[test]
    fn test_hard_errors_still_fail() {
        let mut bad = config(BASELINE, ONE_FILE);
        bad.test_configuration.iterations = 0;
        assert!(validate_config(&bad).unwrap_err().is_fatal());
    }

    #[test]
    fn test_no_enabled_scenarios() {
        let warnings = validate_config(&config(
            r#"[{"id":"baseline","name":"No Limit","enabled":false}]"#,
            ONE_FILE,
        ))
        .unwrap();
        assert!(messages(&warnings)[0].contains("No enabled network scenarios"));
    }

    #[test]
    fn test_bandwidth_without_command() {
        let warnings = validate_config(&config(
            r#"[{"id":"bw-10m","name":"10 Mbit","bandwidth":"10mbit"}]"#,
            ONE_FILE,
        ))
        .unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("bw-10m"));
        assert_eq!(warnings[0].level, ValidationLevel::Warning);
    }

    #[test]
    fn test_size_label_disagreement() {
        let warnings = validate_config(&config(
            BASELINE,
            r#"[{"filename":"a.dat","size":"10MB","sizeBytes":1048576},
                {"filename":"b.dat","size":"1MiB","sizeBytes":1048576}]"#,
        ))
        .unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("a.dat"));
    }

    #[test]
    fn test_duplicate_file_names() {
        let warnings = validate_config(&config(
            BASELINE,
            r#"[{"filename":"a.dat","sizeBytes":1024},{"filename":"a.dat","sizeBytes":2048}]"#,
        ))
        .unwrap();
        assert!(messages(&warnings).iter().any(|m| m.contains("listed twice")));
    }

    #[test]
    fn test_size_label_tolerance() {
        assert!(ConfigValidator::size_label_matches(1_000_000, 1_048_576));
        assert!(!ConfigValidator::size_label_matches(10_000_000, 1_048_576));
        assert!(ConfigValidator::size_label_matches(0, 0));
    }
}
