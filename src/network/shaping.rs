//! Bandwidth constraints applied through external shaping scripts

use super::CommandRunner;
use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::config::{BenchConfig, NetworkScenario},
    types::ShapingMode,
};
use std::sync::Arc;
use std::time::Duration;

/// Scripts and settle intervals used by the conditioner
#[derive(Debug, Clone)]
pub struct ShapingSettings {
    /// Clears shaping state on one target
    pub stop_script: String,
    /// Clears shaping state on the whole fleet
    pub clear_all_script: String,
    pub bulk_settle: Duration,
    pub target_settle: Duration,
}

impl ShapingSettings {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            stop_script: config.fleet.stop_script.clone(),
            clear_all_script: config.fleet.remove_all_script.clone(),
            bulk_settle: config.harness.bulk_settle(),
            target_settle: config.harness.target_settle(),
        }
    }
}

/// A scenario's constraint as applied. Hand it back to
/// [`NetworkConditioner::release`] once the scenario's trials finish.
#[derive(Debug)]
#[must_use = "an applied constraint must be released"]
pub struct AppliedConstraint {
    pub scenario_id: String,
    pub mode: ShapingMode,
    pub bandwidth: Option<String>,
    /// Targets that flow through release in per-target mode
    pub targets: Vec<String>,
    /// Apply invocations that failed; the scenario runs degraded
    pub failures: Vec<String>,
}

impl AppliedConstraint {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// The only component that mutates fleet bandwidth state
pub struct NetworkConditioner {
    runner: Arc<dyn CommandRunner>,
    settings: ShapingSettings,
    logger: Logger,
    /// A bulk constraint is still in place from an earlier scenario
    bulk_active: bool,
}

impl NetworkConditioner {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: ShapingSettings, logger: Logger) -> Self {
        Self {
            runner,
            settings,
            logger,
            bulk_active: false,
        }
    }

    pub fn bulk_active(&self) -> bool {
        self.bulk_active
    }

    /// Apply a scenario's constraint. The shaping mode is checked once: bulk
    /// scripts run a single time for the whole fleet, per-target scripts run
    /// stop-then-apply on every target. Failures are logged, never raised.
    pub async fn apply_scenario(
        &mut self,
        scenario: &NetworkScenario,
        targets: &[String],
    ) -> AppliedConstraint {
        let mode = scenario.mode();

        // A bulk limit left by the previous scenario is superseded only by another bulk apply
        if self.bulk_active && !(mode == ShapingMode::Bulk && scenario.is_constrained()) {
            self.clear_all().await;
        }

        let mut failures = Vec::new();
        match mode {
            ShapingMode::Bulk => {
                if let Err(error) = self.apply_bulk(scenario).await {
                    self.warn_failure(scenario, "all targets", &error).await;
                    failures.push(error.to_string());
                }
            }
            ShapingMode::PerTarget => {
                if scenario.is_constrained() {
                    self.logger
                        .info(&format!("Applying limits to {} targets", targets.len()))
                        .field("scenario", &scenario.id)
                        .log()
                        .await;
                }
                for target in targets {
                    if let Err(error) = self.apply(scenario, target).await {
                        self.warn_failure(scenario, target, &error).await;
                        failures.push(error.to_string());
                    }
                }
            }
        }

        AppliedConstraint {
            scenario_id: scenario.id.clone(),
            mode,
            bandwidth: scenario.bandwidth.clone(),
            targets: targets.to_vec(),
            failures,
        }
    }

    /// Stop-then-apply the scenario's limit on one target
    pub async fn apply(&mut self, scenario: &NetworkScenario, target: &str) -> Result<()> {
        let Some(bandwidth) = scenario.bandwidth.as_deref() else {
            self.logger
                .debug(&format!("No bandwidth limit for {} on {}", scenario.name, target))
                .log()
                .await;
            return Ok(());
        };

        self.stop(target).await;

        let output = self
            .runner
            .run(&scenario.bandwidth_command, &[target, bandwidth])
            .await
            .map_err(|e| AppError::shaping(e.to_string()))?;
        if !output.success {
            return Err(AppError::shaping(format!(
                "{} {} {} failed: {}",
                scenario.bandwidth_command,
                target,
                bandwidth,
                output.describe()
            )));
        }

        self.logger
            .info(&format!("Applied {} limit to {}", bandwidth, target))
            .field("scenario", &scenario.id)
            .log()
            .await;
        settle(self.settings.target_settle).await;
        Ok(())
    }

    /// One invocation constraining every node or router
    pub async fn apply_bulk(&mut self, scenario: &NetworkScenario) -> Result<()> {
        let Some(bandwidth) = scenario.bandwidth.as_deref() else {
            self.logger
                .debug(&format!("No bandwidth limit for {}", scenario.name))
                .log()
                .await;
            return Ok(());
        };

        let output = self
            .runner
            .run(&scenario.bandwidth_command, &[bandwidth])
            .await
            .map_err(|e| AppError::shaping(e.to_string()))?;
        if !output.success {
            return Err(AppError::shaping(format!(
                "{} {} failed: {}",
                scenario.bandwidth_command,
                bandwidth,
                output.describe()
            )));
        }
        self.bulk_active = true;

        let scope = if ShapingMode::targets_routers(&scenario.bandwidth_command) {
            "all routers"
        } else {
            "all containers"
        };
        self.logger
            .info(&format!("Applied {} limit to {}", bandwidth, scope))
            .field("scenario", &scenario.id)
            .log()
            .await;
        settle(self.settings.bulk_settle).await;
        Ok(())
    }

    /// Clear shaping state on one target. Never fails.
    pub async fn remove(&mut self, target: &str) {
        self.stop(target).await;
        self.logger
            .info(&format!("Removed bandwidth limit from {}", target))
            .log()
            .await;
        settle(self.settings.target_settle).await;
    }

    /// Release a scenario's constraint. Bulk constraints stay in place until
    /// the next scenario supersedes them or [`NetworkConditioner::finish`].
    pub async fn release(&mut self, constraint: AppliedConstraint) {
        match constraint.mode {
            ShapingMode::Bulk => {
                if self.bulk_active {
                    self.logger
                        .info("Bandwidth limits will be updated by the next scenario")
                        .field("scenario", &constraint.scenario_id)
                        .log()
                        .await;
                }
            }
            ShapingMode::PerTarget => {
                for target in &constraint.targets {
                    self.remove(target).await;
                }
            }
        }
    }

    /// Clear a bulk constraint still in place at the end of a run
    pub async fn finish(&mut self) {
        if self.bulk_active {
            self.clear_all().await;
        }
    }

    /// Run the fleet-wide clear script. Never fails.
    pub async fn clear_all(&mut self) {
        match self.runner.run(&self.settings.clear_all_script, &[]).await {
            Ok(output) if output.success => {
                self.logger.info("Cleared bandwidth limits on all targets").log().await;
            }
            Ok(output) => {
                self.logger
                    .warn("Failed to clear bandwidth limits")
                    .field("detail", output.describe())
                    .log()
                    .await;
            }
            Err(error) => {
                self.logger
                    .warn("Failed to clear bandwidth limits")
                    .error_info(&error)
                    .field("detail", error.to_string())
                    .log()
                    .await;
            }
        }
        self.bulk_active = false;
        settle(self.settings.bulk_settle).await;
    }

    async fn stop(&self, target: &str) {
        match self.runner.run(&self.settings.stop_script, &[target]).await {
            Ok(output) if output.success => {}
            Ok(output) => {
                self.logger
                    .debug(&format!("Stop script reported failure for {}", target))
                    .field("detail", output.describe())
                    .log()
                    .await;
            }
            Err(error) => {
                self.logger
                    .warn(&format!("Could not run stop script for {}", target))
                    .field("detail", error.to_string())
                    .log()
                    .await;
            }
        }
    }

    async fn warn_failure(&self, scenario: &NetworkScenario, target: &str, error: &AppError) {
        self.logger
            .warn(&format!("Failed to apply limit to {}; scenario continues unconstrained", target))
            .field("scenario", &scenario.id)
            .field("detail", error.to_string())
            .error_info(error)
            .log()
            .await;
    }
}

async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
