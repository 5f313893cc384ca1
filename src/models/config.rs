//! Benchmark configuration data model and validation

use crate::types::{AppError, NodeRole, Result, ShapingMode, TargetPlanKind, WriteMode};
use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Complete benchmark configuration, as read from `test-scenarios.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchConfig {
    /// Run-wide settings
    pub test_configuration: TestConfiguration,

    /// Size classes under test
    pub test_files: Vec<TestFile>,

    /// Network conditions, run in configured order
    pub network_scenarios: Vec<NetworkScenario>,

    /// Storage nodes and their roles
    pub test_targets: Vec<NodeTarget>,

    /// Hosts reshaped by per-target scenarios; defaults to every test target
    #[serde(default)]
    pub shaping_targets: Vec<String>,

    /// External fleet lifecycle commands
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Timing knobs of the harness itself
    #[serde(default)]
    pub harness: HarnessConfig,
}

/// Run-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfiguration {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Trials per file per scenario
    pub iterations: u32,

    #[serde(default = "default_output_directory")]
    pub output_directory: String,

    /// Per-call timeout, seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
}

/// A size class under test. Content is regenerated for every trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFile {
    pub filename: String,

    /// Human-readable size; derived from `size_bytes` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    pub size_bytes: u64,
}

impl TestFile {
    pub fn new(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            size: None,
            size_bytes,
        }
    }

    pub fn human_size(&self) -> String {
        self.size
            .clone()
            .unwrap_or_else(|| ByteSize::b(self.size_bytes).to_string())
    }
}

/// A named network condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkScenario {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Rate limit handed to the shaping script; `None` runs unconstrained
    #[serde(default)]
    pub bandwidth: Option<String>,

    /// Script applying the limit
    #[serde(default)]
    pub bandwidth_command: String,

    /// Explicit shaping mode; inferred from `bandwidth_command` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shaping_mode: Option<ShapingMode>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl NetworkScenario {
    /// Unconstrained baseline scenario
    pub fn unlimited(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            bandwidth: None,
            bandwidth_command: String::new(),
            shaping_mode: None,
            enabled: true,
        }
    }

    /// Resolved shaping mode, decided once per scenario
    pub fn mode(&self) -> ShapingMode {
        self.shaping_mode
            .unwrap_or_else(|| ShapingMode::infer(&self.bandwidth_command))
    }

    pub fn bandwidth_label(&self) -> &str {
        self.bandwidth.as_deref().unwrap_or("Unlimited")
    }

    pub fn is_constrained(&self) -> bool {
        self.bandwidth.is_some()
    }
}

/// A storage node's control API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTarget {
    /// Hostname or container name
    #[serde(rename = "container", alias = "address")]
    pub address: String,

    pub role: NodeRole,

    /// Control API port
    pub api_port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_port: Option<u16>,
}

impl NodeTarget {
    pub fn new(address: impl Into<String>, role: NodeRole, api_port: u16) -> Self {
        Self {
            address: address.into(),
            role,
            api_port,
            gateway_port: None,
        }
    }

    /// Base URL of the control API, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.api_port)
    }
}

/// External commands managing the node fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetConfig {
    /// Container runtime CLI used for preflight and restarts
    #[serde(default = "default_control_plane")]
    pub control_plane: String,

    /// Containers restarted for a clean baseline; defaults to the test targets
    #[serde(default)]
    pub containers: Vec<String>,

    /// Containers that must be running before the run starts; defaults to
    /// the first two test targets
    #[serde(default)]
    pub required_containers: Vec<String>,

    #[serde(default = "default_stop_script")]
    pub stop_script: String,

    #[serde(default = "default_remove_all_script")]
    pub remove_all_script: String,

    #[serde(default = "default_peer_connect_script")]
    pub peer_connect_script: String,

    /// Wait after restarting before reconnecting peers, seconds
    #[serde(default = "default_restart_settle_secs")]
    pub restart_settle_secs: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            control_plane: default_control_plane(),
            containers: Vec::new(),
            required_containers: Vec::new(),
            stop_script: default_stop_script(),
            remove_all_script: default_remove_all_script(),
            peer_connect_script: default_peer_connect_script(),
            restart_settle_secs: default_restart_settle_secs(),
        }
    }
}

/// Timing knobs of the harness
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessConfig {
    /// Wait between write and read, milliseconds
    #[serde(default = "default_propagation_delay_ms")]
    pub propagation_delay_ms: u64,

    /// Settle after a bulk apply, milliseconds
    #[serde(default = "default_bulk_settle_ms")]
    pub bulk_settle_ms: u64,

    /// Settle after a per-target apply or remove, milliseconds
    #[serde(default = "default_target_settle_ms")]
    pub target_settle_ms: u64,

    /// Print progress and sweep storage every N iterations
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u32,

    /// Explicit write mode; the target plan picks one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_mode: Option<WriteMode>,

    #[serde(default)]
    pub target_plan: TargetPlanKind,

    /// Timeout of a per-trial reclaim call, seconds
    #[serde(default = "default_reclaim_timeout_secs")]
    pub reclaim_timeout_secs: u64,

    /// Timeout of a fleet-wide garbage-collect sweep, seconds
    #[serde(default = "default_reclaim_all_timeout_secs")]
    pub reclaim_all_timeout_secs: u64,

    /// Timeout of an external script invocation, seconds
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            propagation_delay_ms: default_propagation_delay_ms(),
            bulk_settle_ms: default_bulk_settle_ms(),
            target_settle_ms: default_target_settle_ms(),
            progress_interval: default_progress_interval(),
            write_mode: None,
            target_plan: TargetPlanKind::default(),
            reclaim_timeout_secs: default_reclaim_timeout_secs(),
            reclaim_all_timeout_secs: default_reclaim_all_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl HarnessConfig {
    pub fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }

    pub fn bulk_settle(&self) -> Duration {
        Duration::from_millis(self.bulk_settle_ms)
    }

    pub fn target_settle(&self) -> Duration {
        Duration::from_millis(self.target_settle_ms)
    }

    pub fn reclaim_timeout(&self) -> Duration {
        Duration::from_secs(self.reclaim_timeout_secs)
    }

    pub fn reclaim_all_timeout(&self) -> Duration {
        Duration::from_secs(self.reclaim_all_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Pinned writes pair with rotation, unpinned with the fixed fleet load test
    pub fn effective_write_mode(&self) -> WriteMode {
        self.write_mode.unwrap_or(match self.target_plan {
            TargetPlanKind::Fixed => WriteMode::Unpinned,
            TargetPlanKind::Rotating => WriteMode::Pinned,
        })
    }
}

impl BenchConfig {
    /// Parse a configuration document
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| AppError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.test_configuration.timeout)
    }

    pub fn iterations(&self) -> u32 {
        self.test_configuration.iterations
    }

    /// Enabled scenarios in configured order
    pub fn enabled_scenarios(&self) -> Vec<&NetworkScenario> {
        self.network_scenarios.iter().filter(|s| s.enabled).collect()
    }

    /// Hosts reshaped one by one in per-target mode
    pub fn shaping_targets(&self) -> Vec<String> {
        if self.shaping_targets.is_empty() {
            self.test_targets.iter().map(|t| t.address.clone()).collect()
        } else {
            self.shaping_targets.clone()
        }
    }

    /// Containers restarted for a clean baseline
    pub fn fleet_containers(&self) -> Vec<String> {
        if self.fleet.containers.is_empty() {
            self.test_targets.iter().map(|t| t.address.clone()).collect()
        } else {
            self.fleet.containers.clone()
        }
    }

    /// Containers that must be running before any scenario
    pub fn required_containers(&self) -> Vec<String> {
        if self.fleet.required_containers.is_empty() {
            self.test_targets
                .iter()
                .take(2)
                .map(|t| t.address.clone())
                .collect()
        } else {
            self.fleet.required_containers.clone()
        }
    }

    /// The single upload-role and download-role targets
    pub fn fixed_targets(&self) -> Result<(&NodeTarget, &NodeTarget)> {
        Ok((
            Self::single_role(&self.test_targets, NodeRole::Upload)?,
            Self::single_role(&self.test_targets, NodeRole::Download)?,
        ))
    }

    fn single_role(targets: &[NodeTarget], role: NodeRole) -> Result<&NodeTarget> {
        let mut matching = targets.iter().filter(|t| t.role == role);
        match (matching.next(), matching.next()) {
            (Some(target), None) => Ok(target),
            (None, _) => Err(AppError::config(format!("No {} target configured", role))),
            (Some(first), Some(second)) => Err(AppError::config(format!(
                "Ambiguous {} target: both '{}' and '{}' have that role",
                role, first.address, second.address
            ))),
        }
    }

    /// Validate the configuration and return the first error found
    pub fn validate(&self) -> Result<()> {
        if self.test_configuration.iterations == 0 {
            return Err(AppError::config("Iterations must be greater than 0"));
        }

        if self.test_configuration.timeout == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.test_configuration.output_directory.trim().is_empty() {
            return Err(AppError::config("Output directory cannot be empty"));
        }

        if self.test_files.is_empty() {
            return Err(AppError::config("At least one test file must be configured"));
        }

        for file in &self.test_files {
            if file.filename.trim().is_empty() {
                return Err(AppError::config("Test file name cannot be empty"));
            }
            if file.size_bytes == 0 {
                return Err(AppError::config(format!(
                    "Test file '{}' must have a non-zero size",
                    file.filename
                )));
            }
        }

        let mut seen = HashSet::new();
        for scenario in &self.network_scenarios {
            if scenario.id.trim().is_empty() {
                return Err(AppError::config("Scenario id cannot be empty"));
            }
            if !seen.insert(scenario.id.as_str()) {
                return Err(AppError::config(format!("Duplicate scenario id '{}'", scenario.id)));
            }
        }

        for target in &self.test_targets {
            if target.address.trim().is_empty() {
                return Err(AppError::config("Target address cannot be empty"));
            }
            if target.api_port == 0 {
                return Err(AppError::config(format!(
                    "Target '{}' has an invalid API port",
                    target.address
                )));
            }
        }

        match self.harness.target_plan {
            TargetPlanKind::Fixed => {
                self.fixed_targets()?;
            }
            TargetPlanKind::Rotating => {
                if self.test_targets.len() < 2 {
                    return Err(AppError::config(
                        "Node rotation needs at least two targets",
                    ));
                }
            }
        }

        if self.harness.progress_interval == 0 {
            return Err(AppError::config("Progress interval must be greater than 0"));
        }

        Ok(())
    }
}

fn default_output_directory() -> String {
    crate::defaults::DEFAULT_OUTPUT_DIRECTORY.to_string()
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_true() -> bool {
    true
}

fn default_control_plane() -> String {
    "docker".to_string()
}

fn default_stop_script() -> String {
    "/app/scripts/network-chaos/stop-chaos.sh".to_string()
}

fn default_remove_all_script() -> String {
    "/app/scripts/network-chaos/remove-bandwidth-limit.sh".to_string()
}

fn default_peer_connect_script() -> String {
    "/app/scripts/connect-ipfs-peers.sh".to_string()
}

fn default_restart_settle_secs() -> u64 {
    15
}

fn default_propagation_delay_ms() -> u64 {
    crate::defaults::DEFAULT_PROPAGATION_DELAY.as_millis() as u64
}

fn default_bulk_settle_ms() -> u64 {
    crate::defaults::DEFAULT_BULK_SETTLE.as_millis() as u64
}

fn default_target_settle_ms() -> u64 {
    crate::defaults::DEFAULT_TARGET_SETTLE.as_millis() as u64
}

fn default_progress_interval() -> u32 {
    crate::defaults::DEFAULT_PROGRESS_INTERVAL
}

fn default_reclaim_timeout_secs() -> u64 {
    10
}

fn default_reclaim_all_timeout_secs() -> u64 {
    30
}

fn default_command_timeout_secs() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "testConfiguration": {
            "name": "IPFS Bandwidth Test",
            "description": "Upload/download under shaped links",
            "iterations": 3,
            "outputDirectory": "results",
            "timeout": 300
        },
        "testFiles": [
            { "filename": "test1m.dat", "size": "1MB", "sizeBytes": 1048576 },
            { "filename": "test10m.dat", "sizeBytes": 10485760 }
        ],
        "networkScenarios": [
            { "id": "baseline", "name": "No Limit", "description": "Unconstrained",
              "bandwidth": null, "bandwidthCommand": "", "enabled": true },
            { "id": "bw-10m", "name": "10 Mbit", "bandwidth": "10mbit",
              "bandwidthCommand": "/app/scripts/network-chaos/limit-bandwidth-all.sh", "enabled": true },
            { "id": "bw-1m", "name": "1 Mbit", "bandwidth": "1mbit",
              "bandwidthCommand": "/app/scripts/network-chaos/limit-bandwidth.sh", "enabled": false }
        ],
        "testTargets": [
            { "container": "ipfs-org1", "role": "upload", "apiPort": 5001, "gatewayPort": 8080 },
            { "container": "ipfs-org2", "role": "download", "apiPort": 5001 }
        ]
    }"#;

    #[test]
    fn test_parse_sample_config() {
        let config = BenchConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.test_configuration.iterations, 3);
        assert_eq!(config.test_files.len(), 2);
        assert_eq!(config.test_files[0].human_size(), "1MB");
        assert!(config.test_files[1].human_size().contains("MiB"));
        assert_eq!(config.enabled_scenarios().len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scenario_modes() {
        let config = BenchConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.network_scenarios[0].mode(), ShapingMode::PerTarget);
        assert!(!config.network_scenarios[0].is_constrained());
        assert_eq!(config.network_scenarios[0].bandwidth_label(), "Unlimited");
        assert_eq!(config.network_scenarios[1].mode(), ShapingMode::Bulk);
        assert_eq!(config.network_scenarios[2].mode(), ShapingMode::PerTarget);
    }

    #[test]
    fn test_explicit_shaping_mode_wins() {
        let mut scenario = NetworkScenario::unlimited("x", "X");
        scenario.bandwidth_command = "./limit-bandwidth-all.sh".to_string();
        scenario.shaping_mode = Some(ShapingMode::PerTarget);
        assert_eq!(scenario.mode(), ShapingMode::PerTarget);
    }

    #[test]
    fn test_defaults_derived_from_targets() {
        let config = BenchConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.shaping_targets(), vec!["ipfs-org1", "ipfs-org2"]);
        assert_eq!(config.fleet_containers(), vec!["ipfs-org1", "ipfs-org2"]);
        assert_eq!(config.required_containers(), vec!["ipfs-org1", "ipfs-org2"]);
        assert_eq!(config.fleet.control_plane, "docker");
        assert_eq!(config.harness.propagation_delay(), Duration::from_millis(500));
        assert_eq!(config.harness.effective_write_mode(), WriteMode::Unpinned);
    }

    #[test]
    fn test_target_base_url() {
        let target = NodeTarget::new("ipfs-org1", NodeRole::Upload, 5001);
        assert_eq!(target.base_url(), "http://ipfs-org1:5001");
    }

    #[test]
    fn test_missing_download_target_is_config_error() {
        let mut config = BenchConfig::from_json_str(SAMPLE).unwrap();
        config.test_targets.retain(|t| t.role != NodeRole::Download);
        let error = config.validate().unwrap_err();
        assert!(error.is_fatal());
        assert!(error.to_string().contains("No download target"));
    }

    #[test]
    fn test_ambiguous_upload_target_is_config_error() {
        let mut config = BenchConfig::from_json_str(SAMPLE).unwrap();
        config
            .test_targets
            .push(NodeTarget::new("ipfs-org3", NodeRole::Upload, 5001));
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("Ambiguous upload target"));
    }

    #[test]
    fn test_rotation_ignores_roles_but_needs_two_nodes() {
        let mut config = BenchConfig::from_json_str(SAMPLE).unwrap();
        config.harness.target_plan = TargetPlanKind::Rotating;
        config
            .test_targets
            .push(NodeTarget::new("ipfs-org3", NodeRole::Peer, 5001));
        assert!(config.validate().is_ok());
        assert_eq!(config.harness.effective_write_mode(), WriteMode::Pinned);

        config.test_targets.truncate(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = BenchConfig::from_json_str(SAMPLE).unwrap();
        config.test_configuration.iterations = 0;
        assert!(config.validate().is_err());

        let mut config = BenchConfig::from_json_str(SAMPLE).unwrap();
        config.test_files[0].size_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = BenchConfig::from_json_str(SAMPLE).unwrap();
        config.network_scenarios[1].id = "baseline".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Duplicate scenario id"));
    }

    #[test]
    fn test_malformed_document() {
        let error = BenchConfig::from_json_str("{ \"testFiles\": [] }").unwrap_err();
        assert!(error.is_fatal());
    }
}
