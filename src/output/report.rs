//! Run report persistence: JSON checkpoints and CSV export

use crate::{
    error::{AppError, ErrorContext, Result},
    models::metrics::{RunReport, TrialResult},
};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes the run report to one file for the whole run. Each write replaces
/// the file atomically, so a reader never sees a truncated snapshot.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    directory: PathBuf,
    path: PathBuf,
}

impl ReportWriter {
    /// Report named after the run's start time: `test_results_YYYYmmdd_HHMMSS.json`
    pub fn new(directory: impl Into<PathBuf>, started_at: DateTime<Local>) -> Self {
        let directory = directory.into();
        let path = directory.join(format!(
            "test_results_{}.json",
            started_at.format("%Y%m%d_%H%M%S")
        ));
        Self { directory, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// CSV export sitting next to the JSON report
    pub fn csv_path(&self) -> PathBuf {
        self.path.with_extension("csv")
    }

    fn ensure_directory(&self) -> Result<()> {
        fs::create_dir_all(&self.directory).map_err(|e| {
            AppError::io(format!(
                "Failed to create output directory '{}': {}",
                self.directory.display(),
                e
            ))
        })
    }

    /// Persist a snapshot of the run
    pub fn write(&self, report: &RunReport) -> Result<&Path> {
        self.ensure_directory()?;

        let content = serde_json::to_string_pretty(report)
            .map_err(|e| AppError::internal(format!("Failed to serialize run report: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| {
            AppError::io(format!("Failed to write report '{}': {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::io(format!(
                "Failed to move report into place '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(&self.path)
    }

    /// Export every trial as one CSV row
    pub fn write_csv(&self, results: &[TrialResult]) -> Result<PathBuf> {
        self.ensure_directory()?;
        let path = self.csv_path();

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create CSV export '{}'", path.display()))?;
        for result in results {
            writer.serialize(CsvRow::from(result))?;
        }
        writer.flush().context("Failed to flush CSV export")?;

        Ok(path)
    }

    /// Read a report back
    pub fn load(path: impl AsRef<Path>) -> Result<RunReport> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read report '{}'", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse run report")
    }
}

/// Flat CSV shape of a trial
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    scenario: &'a str,
    bandwidth: &'a str,
    file: &'a str,
    file_size: u64,
    iteration: u32,
    success: bool,
    content_id: &'a str,
    upload_node: &'a str,
    download_node: &'a str,
    random_data_gen_time: f64,
    upload_time: f64,
    download_time: f64,
    upload_mbps: f64,
    download_mbps: f64,
    total_time: f64,
    error: &'a str,
}

impl<'a> From<&'a TrialResult> for CsvRow<'a> {
    fn from(result: &'a TrialResult) -> Self {
        Self {
            scenario: &result.scenario,
            bandwidth: &result.bandwidth,
            file: &result.file,
            file_size: result.file_size,
            iteration: result.iteration,
            success: result.success,
            content_id: result.content_id.as_deref().unwrap_or(""),
            upload_node: &result.upload_node,
            download_node: &result.download_node,
            random_data_gen_time: result.random_data_gen_time,
            upload_time: result.upload_time,
            download_time: result.download_time,
            upload_mbps: result.upload_mbps(),
            download_mbps: result.download_mbps(),
            total_time: result.total_time,
            error: result.error.as_deref().unwrap_or(""),
        }
    }
}
