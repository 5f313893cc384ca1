//! Container fleet preflight checks and restarts

use super::CommandRunner;
use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::config::BenchConfig,
};
use std::sync::Arc;
use std::time::Duration;

/// Commands and containers managed by the fleet manager
#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub control_plane: String,
    /// Restarted for a clean baseline; never includes the harness itself
    pub containers: Vec<String>,
    /// Must be running before any scenario
    pub required: Vec<String>,
    pub remove_all_script: String,
    pub peer_connect_script: String,
    pub restart_settle: Duration,
}

impl FleetSettings {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            control_plane: config.fleet.control_plane.clone(),
            containers: config.fleet_containers(),
            required: config.required_containers(),
            remove_all_script: config.fleet.remove_all_script.clone(),
            peer_connect_script: config.fleet.peer_connect_script.clone(),
            restart_settle: Duration::from_secs(config.fleet.restart_settle_secs),
        }
    }
}

pub struct FleetManager {
    runner: Arc<dyn CommandRunner>,
    settings: FleetSettings,
    logger: Logger,
}

impl FleetManager {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: FleetSettings, logger: Logger) -> Self {
        Self {
            runner,
            settings,
            logger,
        }
    }

    pub fn settings(&self) -> &FleetSettings {
        &self.settings
    }

    /// The container runtime answers
    pub async fn check_control_plane(&self) -> Result<()> {
        let output = self
            .runner
            .run(&self.settings.control_plane, &["ps"])
            .await
            .map_err(|e| {
                AppError::config(format!(
                    "{} is not available: {}",
                    self.settings.control_plane, e
                ))
            })?;

        if !output.success {
            return Err(AppError::config(format!(
                "{} is not reachable: {}",
                self.settings.control_plane,
                output.describe()
            )));
        }
        Ok(())
    }

    /// Every required container shows up as running
    pub async fn check_required_nodes(&self) -> Result<()> {
        let output = self
            .runner
            .run(&self.settings.control_plane, &["ps", "--format", "{{.Names}}"])
            .await
            .map_err(|e| AppError::config(format!("Failed to list containers: {}", e)))?;
        if !output.success {
            return Err(AppError::config(format!(
                "Failed to list containers: {}",
                output.describe()
            )));
        }

        let running: Vec<&str> = output.output.lines().map(str::trim).collect();
        let missing: Vec<&str> = self
            .settings
            .required
            .iter()
            .map(String::as_str)
            .filter(|name| !running.contains(name))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::config(format!(
                "Required containers are not running: {}",
                missing.join(", ")
            )))
        }
    }

    /// Preflight: control plane reachable and required nodes running
    pub async fn preflight(&self) -> Result<()> {
        self.check_control_plane().await?;
        self.check_required_nodes().await?;
        self.logger
            .info(&format!(
                "Preflight passed: {} running",
                self.settings.required.join(", ")
            ))
            .log()
            .await;
        Ok(())
    }

    /// Remove every bandwidth limit on the fleet
    pub async fn clear_all_shaping(&self) -> Result<()> {
        let output = self.runner.run(&self.settings.remove_all_script, &[]).await?;
        if output.success {
            Ok(())
        } else {
            Err(AppError::shaping(format!(
                "{} failed: {}",
                self.settings.remove_all_script,
                output.describe()
            )))
        }
    }

    /// Clear shaping, then restart the node containers
    pub async fn restart(&self) -> Result<()> {
        if let Err(error) = self.clear_all_shaping().await {
            self.logger
                .warn("Failed to remove bandwidth limits before restart")
                .field("detail", error.to_string())
                .log()
                .await;
        }

        let mut args = vec!["restart"];
        args.extend(self.settings.containers.iter().map(String::as_str));

        let output = self.runner.run(&self.settings.control_plane, &args).await?;
        if !output.success {
            return Err(AppError::io(format!(
                "Fleet restart failed: {}",
                output.describe()
            )));
        }
        Ok(())
    }

    pub async fn reconnect_peers(&self) -> Result<()> {
        let output = self
            .runner
            .run("/bin/bash", &[self.settings.peer_connect_script.as_str()])
            .await?;
        if !output.success {
            return Err(AppError::io(format!(
                "Fleet peer reconnect failed: {}",
                output.describe()
            )));
        }
        Ok(())
    }

    /// Restart, wait for the nodes, and reconnect peers. Failures are
    /// logged and the run continues; returns whether the reset completed.
    pub async fn reset(&self) -> bool {
        self.logger
            .info(&format!(
                "Restarting {} containers for a clean network state",
                self.settings.containers.len()
            ))
            .log()
            .await;

        if let Err(error) = self.restart().await {
            self.logger
                .warn("Failed to restart containers")
                .field("detail", error.to_string())
                .error_info(&error)
                .log()
                .await;
            return false;
        }

        if !self.settings.restart_settle.is_zero() {
            tokio::time::sleep(self.settings.restart_settle).await;
        }

        match self.reconnect_peers().await {
            Ok(()) => {
                self.logger.info("Containers restarted and peers connected").log().await;
                true
            }
            Err(error) => {
                self.logger
                    .warn("Failed to reconnect peers")
                    .field("detail", error.to_string())
                    .error_info(&error)
                    .log()
                    .await;
                false
            }
        }
    }
}
