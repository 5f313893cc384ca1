//! Every file and iteration under one network condition

use super::{TargetPlan, TrialRunner};
use crate::{
    client::NodeApi,
    error::Result,
    logging::Logger,
    models::{BenchConfig, NetworkScenario, NodeTarget, TestFile, TrialResult},
    network::{FleetManager, NetworkConditioner},
    stats::StatisticsEngine,
};
use futures::future::join_all;
use std::sync::Arc;

/// Loop bounds of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioSettings {
    /// Trials per file
    pub iterations: u32,
    /// Progress line and storage sweep every N iterations
    pub progress_interval: u32,
    /// Restart the fleet and reconnect peers before applying the constraint
    pub restart_fleet: bool,
}

impl ScenarioSettings {
    pub fn from_config(config: &BenchConfig, restart_fleet: bool) -> Self {
        Self {
            iterations: config.iterations(),
            progress_interval: config.harness.progress_interval.max(1),
            restart_fleet,
        }
    }
}

/// Drives one scenario: optional fleet reset, apply the constraint, run
/// every file for every iteration, release the constraint.
pub struct ScenarioRunner {
    trials: TrialRunner,
    api: Arc<dyn NodeApi>,
    plan: TargetPlan,
    /// Swept with a full garbage-collect periodically and after every file
    sweep_nodes: Vec<NodeTarget>,
    shaping_targets: Vec<String>,
    settings: ScenarioSettings,
    stats: StatisticsEngine,
    logger: Logger,
}

impl ScenarioRunner {
    pub fn new(
        trials: TrialRunner,
        api: Arc<dyn NodeApi>,
        plan: TargetPlan,
        settings: ScenarioSettings,
        logger: Logger,
    ) -> Self {
        Self {
            trials,
            api,
            plan,
            sweep_nodes: Vec::new(),
            shaping_targets: Vec::new(),
            settings: ScenarioSettings {
                progress_interval: settings.progress_interval.max(1),
                ..settings
            },
            stats: StatisticsEngine::new(),
            logger,
        }
    }

    pub fn with_sweep_nodes(mut self, nodes: Vec<NodeTarget>) -> Self {
        self.sweep_nodes = nodes;
        self
    }

    pub fn with_shaping_targets(mut self, targets: Vec<String>) -> Self {
        self.shaping_targets = targets;
        self
    }

    pub fn settings(&self) -> ScenarioSettings {
        self.settings
    }

    pub fn plan(&self) -> &TargetPlan {
        &self.plan
    }

    /// Run one scenario and return its results in execution order. The
    /// applied constraint is released on every exit path.
    pub async fn run(
        &self,
        scenario: &NetworkScenario,
        files: &[TestFile],
        conditioner: &mut NetworkConditioner,
        fleet: Option<&FleetManager>,
    ) -> Result<Vec<TrialResult>> {
        self.logger
            .info(&format!("Running scenario: {}", scenario.name))
            .field("scenario", &scenario.id)
            .field("bandwidth", scenario.bandwidth_label())
            .field("description", &scenario.description)
            .log()
            .await;

        if self.settings.restart_fleet {
            if let Some(fleet) = fleet {
                fleet.reset().await;
            }
        }

        let constraint = conditioner
            .apply_scenario(scenario, &self.shaping_targets)
            .await;
        if constraint.is_degraded() {
            self.logger
                .warn(&format!(
                    "Scenario {} runs without its full constraint",
                    scenario.id
                ))
                .field("failures", &constraint.failures)
                .log()
                .await;
        }

        let outcome = self.run_files(scenario, files).await;
        conditioner.release(constraint).await;
        outcome
    }

    async fn run_files(
        &self,
        scenario: &NetworkScenario,
        files: &[TestFile],
    ) -> Result<Vec<TrialResult>> {
        let mut results = Vec::new();

        for file in files {
            self.logger
                .info(&format!("Testing file: {} ({})", file.filename, file.human_size()))
                .field("scenario", &scenario.id)
                .log()
                .await;

            let first = results.len();
            for iteration in 1..=self.settings.iterations {
                let result = self.trials.run(iteration, file, scenario, &self.plan).await?;
                results.push(result);

                if iteration % self.settings.progress_interval == 0 {
                    let (ok, total) =
                        self.stats.progress(&results[first..], &scenario.id, &file.filename);
                    self.logger
                        .info(&format!(
                            "Progress: {}/{} (Success rate: {}/{})",
                            iteration, self.settings.iterations, ok, total
                        ))
                        .log()
                        .await;
                    self.sweep().await;
                }
            }

            self.report_file(&results[first..], scenario, file).await;
            self.sweep().await;
        }

        Ok(results)
    }

    /// Full garbage-collect on every node at once
    async fn sweep(&self) {
        join_all(self.sweep_nodes.iter().map(|node| self.api.reclaim_all(node))).await;
    }

    async fn report_file(&self, results: &[TrialResult], scenario: &NetworkScenario, file: &TestFile) {
        let summary = self.stats.summarize_pair(results, &scenario.id, &file.filename);
        if summary.successes == 0 {
            self.logger
                .warn(&format!(
                    "No successful trials for {} ({}/{})",
                    file.filename, summary.successes, summary.attempts
                ))
                .log()
                .await;
            return;
        }

        self.logger
            .info(&format!(
                "File statistics: success {}/{}, upload {}, download {}",
                summary.successes,
                summary.attempts,
                summary.upload_time.format_mean_std("s"),
                summary.download_time.format_mean_std("s")
            ))
            .field("file", &file.filename)
            .field("success_rate", summary.success_rate)
            .log()
            .await;
    }
}
