//! Type definitions shared across the harness

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Role a node plays in a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Receives the write
    Upload,
    /// Serves the read
    Download,
    /// Part of the fleet but not pinned to a role (rotation, reclaim sweeps)
    Peer,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Upload => write!(f, "upload"),
            NodeRole::Download => write!(f, "download"),
            NodeRole::Peer => write!(f, "peer"),
        }
    }
}

/// How a scenario's bandwidth constraint reaches the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapingMode {
    /// One invocation constrains every node/router at once
    Bulk,
    /// Stop-then-apply once per shaping target
    PerTarget,
}

impl ShapingMode {
    /// Script names that shape the whole fleet in a single invocation
    pub const BULK_SCRIPTS: &'static [&'static str] =
        &["limit-bandwidth-all.sh", "limit-bandwidth-routers.sh"];

    /// Infer the mode from the shaping command path
    pub fn infer(command: &str) -> Self {
        if Self::BULK_SCRIPTS.iter().any(|script| command.contains(script)) {
            ShapingMode::Bulk
        } else {
            ShapingMode::PerTarget
        }
    }

    /// Whether the command reshapes routers rather than node containers
    pub fn targets_routers(command: &str) -> bool {
        command.contains("limit-bandwidth-routers.sh")
    }
}

/// Whether writes ask the node to pin the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// `pin=false`; reclaim is a garbage-collect sweep only
    #[default]
    Unpinned,
    /// Pinned write; reclaim unpins first, then garbage-collects
    Pinned,
}

/// How upload/download nodes are chosen for each trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlanKind {
    /// The single upload-role and download-role target, every trial
    #[default]
    Fixed,
    /// Walk the whole fleet, writing to node `i` and reading from `i + 1`
    Rotating,
}
