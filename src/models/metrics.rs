//! Trial results, summary statistics, and run report data models

use crate::models::config::{BenchConfig, NetworkScenario, NodeTarget, TestFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one {file, scenario, iteration} cell.
///
/// Durations are seconds, throughputs are bytes per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub iteration: u32,

    pub file: String,

    #[serde(rename = "fileSize")]
    pub file_size: u64,

    pub scenario: String,

    pub scenario_name: String,

    pub bandwidth: String,

    pub success: bool,

    #[serde(rename = "ipfs_hash", default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,

    pub random_data_gen_time: f64,

    pub upload_time: f64,

    pub download_time: f64,

    pub upload_throughput: f64,

    pub download_throughput: f64,

    pub total_time: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub upload_node: String,

    #[serde(default)]
    pub download_node: String,

    pub started_at: DateTime<Utc>,
}

impl TrialResult {
    /// Start a result for a trial cell; every measurement is zero until recorded
    pub fn begin(iteration: u32, file: &TestFile, scenario: &NetworkScenario) -> Self {
        Self {
            iteration,
            file: file.filename.clone(),
            file_size: file.size_bytes,
            scenario: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            bandwidth: scenario.bandwidth_label().to_string(),
            success: false,
            content_id: None,
            random_data_gen_time: 0.0,
            upload_time: 0.0,
            download_time: 0.0,
            upload_throughput: 0.0,
            download_throughput: 0.0,
            total_time: 0.0,
            error: None,
            upload_node: String::new(),
            download_node: String::new(),
            started_at: Utc::now(),
        }
    }

    pub fn with_nodes(mut self, upload: &NodeTarget, download: &NodeTarget) -> Self {
        self.upload_node = upload.address.clone();
        self.download_node = download.address.clone();
        self
    }

    pub fn record_generation(&mut self, elapsed: Duration) {
        self.random_data_gen_time = elapsed.as_secs_f64();
    }

    /// Completed write: time and throughput
    pub fn record_upload(&mut self, elapsed: Duration) {
        self.record_upload_attempt(elapsed);
        self.upload_throughput = throughput(self.file_size, self.upload_time);
    }

    /// Failed write: time only
    pub fn record_upload_attempt(&mut self, elapsed: Duration) {
        self.upload_time = elapsed.as_secs_f64();
    }

    /// Completed read: time and throughput
    pub fn record_download(&mut self, elapsed: Duration) {
        self.record_download_attempt(elapsed);
        self.download_throughput = throughput(self.file_size, self.download_time);
    }

    /// Failed read: time only
    pub fn record_download_attempt(&mut self, elapsed: Duration) {
        self.download_time = elapsed.as_secs_f64();
    }

    pub fn upload_mbps(&self) -> f64 {
        to_mbps(self.upload_throughput)
    }

    pub fn download_mbps(&self) -> f64 {
        to_mbps(self.download_throughput)
    }

    /// Close the trial as failed
    pub fn fail(mut self, error: impl ToString) -> Self {
        self.success = false;
        self.total_time = 0.0;
        self.error = Some(error.to_string());
        self
    }

    /// Close the trial as successful; total time covers write and read only
    pub fn succeed(mut self) -> Self {
        self.success = true;
        self.total_time = self.upload_time + self.download_time;
        self.error = None;
        self
    }
}

/// Bytes per second; zero for a non-positive duration
pub fn throughput(bytes: u64, seconds: f64) -> f64 {
    if seconds <= 0.0 {
        0.0
    } else {
        bytes as f64 / seconds
    }
}

/// Convert bytes per second to megabits per second
pub fn to_mbps(bytes_per_sec: f64) -> f64 {
    bytes_per_sec * 8.0 / 1_000_000.0
}

/// Megabits per second for a transfer; zero for a non-positive duration
pub fn throughput_mbps(bytes: u64, seconds: f64) -> f64 {
    to_mbps(throughput(bytes, seconds))
}

/// Summary of a sample set. Never persisted as primary state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "stddev")]
    pub std_dev: f64,
    pub p95: f64,
    pub p99: f64,
    pub count: usize,
}

impl SummaryStatistics {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Format mean and deviation for display
    pub fn format_mean_std(&self, unit: &str) -> String {
        format!("{:.3}{} ± {:.3}{}", self.mean, unit, self.std_dev, unit)
    }
}

/// Statistics of one scenario/file pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file: String,

    pub file_size: u64,

    /// Successful trials
    pub successes: usize,

    /// All attempted trials
    pub attempts: usize,

    /// Percentage over all attempted trials
    pub success_rate: f64,

    pub upload_time: SummaryStatistics,

    pub download_time: SummaryStatistics,

    pub upload_throughput: SummaryStatistics,

    pub download_throughput: SummaryStatistics,
}

/// Statistics of one scenario, per file in first-seen order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario: String,

    pub scenario_name: String,

    pub bandwidth: String,

    pub files: Vec<FileSummary>,
}

/// Build metadata stamped into reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessInfo {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_time: Option<String>,

    pub session_id: String,
}

impl HarnessInfo {
    pub fn current(session_id: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_commit: option_env!("GIT_COMMIT").map(str::to_string),
            build_time: option_env!("BUILD_TIME").map(str::to_string),
            session_id: session_id.into(),
        }
    }
}

/// Persisted run state: configuration snapshot plus every attempted trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub config: BenchConfig,

    pub results: Vec<TrialResult>,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harness: Option<HarnessInfo>,

    /// Present only on the final write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Vec<ScenarioSummary>>,

    /// Present only on the final write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_runtime_secs: Option<f64>,
}

impl RunReport {
    /// Checkpoint snapshot
    pub fn checkpoint(config: BenchConfig, results: Vec<TrialResult>) -> Self {
        Self {
            config,
            results,
            timestamp: Utc::now(),
            harness: None,
            summary: None,
            total_runtime_secs: None,
        }
    }

    /// Final snapshot with summary
    pub fn finalize(mut self, summary: Vec<ScenarioSummary>, runtime: Duration) -> Self {
        self.summary = Some(summary);
        self.total_runtime_secs = Some(runtime.as_secs_f64());
        self
    }

    pub fn with_harness(mut self, info: HarnessInfo) -> Self {
        self.harness = Some(info);
        self
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Results of one scenario/file pair, in execution order
    pub fn results_for<'a>(
        &'a self,
        scenario: &'a str,
        file: &'a str,
    ) -> impl Iterator<Item = &'a TrialResult> + 'a {
        self.results
            .iter()
            .filter(move |r| r.scenario == scenario && r.file == file)
    }
}
