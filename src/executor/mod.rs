//! Benchmark execution engine
//!
//! This module contains the sequential execution components:
//! - Target plans choosing the write and read node of every trial
//! - The trial runner measuring one write-then-read cell
//! - The scenario runner driving every file and iteration under one network condition

pub mod scenario;
pub mod trial;

pub use scenario::{ScenarioRunner, ScenarioSettings};
pub use trial::TrialRunner;

use crate::{
    error::{AppError, Result},
    models::config::{BenchConfig, NodeTarget},
    types::{NodeRole, TargetPlanKind},
};

/// Chooses the upload and download node of every trial
#[derive(Debug, Clone, PartialEq)]
pub enum TargetPlan {
    /// The single upload-role and download-role target, every trial
    Fixed {
        upload: NodeTarget,
        download: NodeTarget,
    },
    /// Every configured target in turn; trial `i` writes to node `(i-1) mod N`
    /// and reads from the node after it
    Rotating { nodes: Vec<NodeTarget> },
}

impl TargetPlan {
    /// Build the plan the configuration asks for
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        match config.harness.target_plan {
            TargetPlanKind::Fixed => {
                let (upload, download) = config.fixed_targets()?;
                Ok(TargetPlan::Fixed {
                    upload: upload.clone(),
                    download: download.clone(),
                })
            }
            TargetPlanKind::Rotating => Ok(TargetPlan::Rotating {
                nodes: config.test_targets.clone(),
            }),
        }
    }

    pub fn kind(&self) -> TargetPlanKind {
        match self {
            TargetPlan::Fixed { .. } => TargetPlanKind::Fixed,
            TargetPlan::Rotating { .. } => TargetPlanKind::Rotating,
        }
    }

    /// Upload and download node of a 1-based iteration. Fails with a
    /// configuration error before any network I/O when no pair resolves.
    pub fn resolve(&self, iteration: u32) -> Result<(&NodeTarget, &NodeTarget)> {
        match self {
            TargetPlan::Fixed { upload, download } => {
                if upload.role != NodeRole::Upload || download.role != NodeRole::Download {
                    return Err(AppError::config("Could not find upload/download targets"));
                }
                Ok((upload, download))
            }
            TargetPlan::Rotating { nodes } => {
                if nodes.len() < 2 {
                    return Err(AppError::config(
                        "Node rotation needs at least two targets",
                    ));
                }
                let upload = (iteration.saturating_sub(1) as usize) % nodes.len();
                let download = (upload + 1) % nodes.len();
                Ok((&nodes[upload], &nodes[download]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, role: NodeRole) -> NodeTarget {
        NodeTarget::new(name, role, 5001)
    }

    #[test]
    fn test_fixed_plan_always_same_pair() {
        let plan = TargetPlan::Fixed {
            upload: node("ipfs-org1", NodeRole::Upload),
            download: node("ipfs-org2", NodeRole::Download),
        };
        for iteration in 1..=5 {
            let (up, down) = plan.resolve(iteration).unwrap();
            assert_eq!(up.address, "ipfs-org1");
            assert_eq!(down.address, "ipfs-org2");
        }
        assert_eq!(plan.kind(), TargetPlanKind::Fixed);
    }

    #[test]
    fn test_fixed_plan_with_wrong_roles_fails_fast() {
        let plan = TargetPlan::Fixed {
            upload: node("ipfs-org1", NodeRole::Upload),
            download: node("ipfs-org2", NodeRole::Peer),
        };
        let error = plan.resolve(1).unwrap_err();
        assert!(error.is_fatal());
    }

    #[test]
    fn test_rotation_walks_the_fleet() {
        let plan = TargetPlan::Rotating {
            nodes: (1..=3)
                .map(|i| node(&format!("ipfs-org{}", i), NodeRole::Peer))
                .collect(),
        };

        let pairs: Vec<(String, String)> = (1..=4)
            .map(|i| {
                let (up, down) = plan.resolve(i).unwrap();
                (up.address.clone(), down.address.clone())
            })
            .collect();

        assert_eq!(pairs[0], ("ipfs-org1".to_string(), "ipfs-org2".to_string()));
        assert_eq!(pairs[1], ("ipfs-org2".to_string(), "ipfs-org3".to_string()));
        assert_eq!(pairs[2], ("ipfs-org3".to_string(), "ipfs-org1".to_string()));
        assert_eq!(pairs[3], pairs[0]);
    }

    #[test]
    fn test_rotation_needs_two_nodes() {
        let plan = TargetPlan::Rotating {
            nodes: vec![node("ipfs-org1", NodeRole::Peer)],
        };
        assert!(plan.resolve(1).unwrap_err().is_fatal());
    }

    #[test]
    fn test_plan_from_config() {
        let config = BenchConfig::from_json_str(
            r#"{"testConfiguration":{"name":"t","iterations":1},
                "testFiles":[{"filename":"a","sizeBytes":1}],
                "networkScenarios":[],
                "testTargets":[
                    {"container":"ipfs-org2","role":"download","apiPort":5001},
                    {"container":"ipfs-org1","role":"upload","apiPort":5001}
                ]}"#,
        )
        .unwrap();

        let plan = TargetPlan::from_config(&config).unwrap();
        let (up, down) = plan.resolve(1).unwrap();
        assert_eq!(up.address, "ipfs-org1");
        assert_eq!(down.address, "ipfs-org2");

        let mut rotating = config.clone();
        rotating.harness.target_plan = TargetPlanKind::Rotating;
        let plan = TargetPlan::from_config(&rotating).unwrap();
        assert_eq!(plan.resolve(1).unwrap().0.address, "ipfs-org2");
    }
}
