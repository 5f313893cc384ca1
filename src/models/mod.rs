//! Data models for the benchmark harness

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{BenchConfig, FleetConfig, HarnessConfig, NetworkScenario, NodeTarget, TestFile};
pub use metrics::{
    FileSummary, HarnessInfo, RunReport, ScenarioSummary, SummaryStatistics, TrialResult,
};
