//! External network shaping and fleet lifecycle commands

pub mod fleet;
pub mod shaping;

pub use fleet::{FleetManager, FleetSettings};
pub use shaping::{AppliedConstraint, NetworkConditioner, ShapingSettings};

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Completed external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// Combined stdout and stderr
    pub output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            output: output.into(),
        }
    }

    pub fn failed(code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            output: output.into(),
        }
    }

    /// Exit status and trimmed output, for error messages
    pub fn describe(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        let output = self.output.trim();
        if output.is_empty() {
            status
        } else {
            format!("{}\nOutput: {}", status, output)
        }
    }
}

/// Runs external programs. Errors mean the program could not be run at
/// all; a non-zero exit is reported through [`CommandOutput::success`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs programs as child processes with a wall-clock limit
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                AppError::io(format!(
                    "{} timed out after {}s",
                    program,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::io(format!("Failed to run {}: {}", program, e)))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            output: combined,
        })
    }
}
