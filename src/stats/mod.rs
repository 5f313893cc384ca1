//! Statistics engine reducing raw trial samples to summaries

#[cfg(test)]
mod comprehensive_tests;

use crate::models::metrics::{FileSummary, ScenarioSummary, SummaryStatistics, TrialResult};

/// Percentiles reported for every sample set
pub const P95: f64 = 0.95;
pub const P99: f64 = 0.99;

/// Summarize an unordered sample set.
///
/// Empty input yields the zero summary. Percentiles are index-based
/// (`floor(count * p)` clamped to the last element), not interpolated.
pub fn summarize(samples: &[f64]) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics::default();
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    // Rounding in the sum can land one ulp outside the sample range
    let mean = (sorted.iter().sum::<f64>() / count as f64).clamp(sorted[0], sorted[count - 1]);

    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    SummaryStatistics {
        mean,
        median,
        min: sorted[0],
        max: sorted[count - 1],
        std_dev: sample_std_dev(&sorted, mean),
        p95: percentile(&sorted, P95),
        p99: percentile(&sorted, P99),
        count,
    }
}

/// Index-based percentile of an ascending, non-empty sample set
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Sample standard deviation (N-1 denominator); zero for one sample or fewer
fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let variance =
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Groups trial results by scenario and file and summarizes each pair.
///
/// Duration and throughput statistics cover successful trials only; success
/// rate covers every attempted trial.
#[derive(Debug, Default)]
pub struct StatisticsEngine;

impl StatisticsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Summaries per scenario, in first-seen order, each with per-file summaries
    pub fn summarize_run(&self, results: &[TrialResult]) -> Vec<ScenarioSummary> {
        let mut scenarios: Vec<ScenarioSummary> = Vec::new();

        for result in results {
            let position = match scenarios.iter().position(|s| s.scenario == result.scenario) {
                Some(position) => position,
                None => {
                    scenarios.push(ScenarioSummary {
                        scenario: result.scenario.clone(),
                        scenario_name: result.scenario_name.clone(),
                        bandwidth: result.bandwidth.clone(),
                        files: Vec::new(),
                    });
                    scenarios.len() - 1
                }
            };

            let scenario = &mut scenarios[position];
            if !scenario.files.iter().any(|f| f.file == result.file) {
                scenario.files.push(self.summarize_pair(results, &result.scenario, &result.file));
            }
        }

        scenarios
    }

    /// Summary of one scenario/file pair
    pub fn summarize_pair(&self, results: &[TrialResult], scenario: &str, file: &str) -> FileSummary {
        let pair: Vec<&TrialResult> = results
            .iter()
            .filter(|r| r.scenario == scenario && r.file == file)
            .collect();
        let successful: Vec<&TrialResult> = pair.iter().copied().filter(|r| r.success).collect();

        let collect = |f: fn(&TrialResult) -> f64| -> Vec<f64> {
            successful.iter().map(|r| f(r)).collect()
        };

        FileSummary {
            file: file.to_string(),
            file_size: pair.first().map(|r| r.file_size).unwrap_or(0),
            successes: successful.len(),
            attempts: pair.len(),
            success_rate: success_rate(successful.len(), pair.len()),
            upload_time: summarize(&collect(|r| r.upload_time)),
            download_time: summarize(&collect(|r| r.download_time)),
            upload_throughput: summarize(&collect(|r| r.upload_throughput)),
            download_throughput: summarize(&collect(|r| r.download_throughput)),
        }
    }

    /// Successes and attempts so far for a scenario/file pair
    pub fn progress(&self, results: &[TrialResult], scenario: &str, file: &str) -> (usize, usize) {
        results
            .iter()
            .filter(|r| r.scenario == scenario && r.file == file)
            .fold((0, 0), |(ok, total), r| (ok + r.success as usize, total + 1))
    }
}

/// Percentage of successful attempts; zero when nothing was attempted
pub fn success_rate(successes: usize, attempts: usize) -> f64 {
    if attempts == 0 {
        0.0
    } else {
        successes as f64 / attempts as f64 * 100.0
    }
}
