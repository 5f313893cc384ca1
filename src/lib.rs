//! Bandwidth Bench
//!
//! A benchmark harness measuring write and read latency and throughput of a
//! content-addressed storage fleet under shaped network bandwidth. Each trial
//! writes a random payload to one node, reads it back from another, and
//! reclaims the artifact on both.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod network;
pub mod output;
pub mod payload;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use app::{BenchmarkOrchestrator, RunContext, RunOutcome};
pub use client::{NodeApi, NodeClient};
pub use error::{AppError, Result};
pub use executor::{ScenarioRunner, TargetPlan, TrialRunner};
pub use models::{BenchConfig, NetworkScenario, NodeTarget, RunReport, TestFile, TrialResult};
pub use network::{CommandRunner, FleetManager, NetworkConditioner};
pub use output::{OutputCoordinator, OutputFormatter, OutputFormatterFactory, ReportWriter};
pub use payload::PayloadGenerator;
pub use stats::StatisticsEngine;

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_CONFIG_FILE: &str = "test-scenarios.json";
    pub const DEFAULT_OUTPUT_DIRECTORY: &str = "results";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
    pub const MAX_TIMEOUT_SECS: u64 = 3600;
    /// Pause between a write and the read on another node
    pub const DEFAULT_PROPAGATION_DELAY: Duration = Duration::from_millis(500);
    pub const DEFAULT_BULK_SETTLE: Duration = Duration::from_secs(3);
    pub const DEFAULT_TARGET_SETTLE: Duration = Duration::from_secs(2);
    pub const DEFAULT_PROGRESS_INTERVAL: u32 = 10;
}
