//! Fabric load accounting
//!
//! Bandwidth figures here are bookkeeping only. Nothing in the engine denies
//! admission because a node is saturated.

use serde::{Deserialize, Serialize};

use super::topology::{FabricTopology, NodeId};

/// Node utilization above which a node is reported as warning
pub const WARNING_UTILIZATION: f64 = 0.90;

/// Node utilization above which a node is reported as critical
pub const CRITICAL_UTILIZATION: f64 = 0.95;

/// Load band for a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLoadLevel {
    Nominal,
    Warning,
    Critical,
}

impl NodeLoadLevel {
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization > CRITICAL_UTILIZATION {
            Self::Critical
        } else if utilization > WARNING_UTILIZATION {
            Self::Warning
        } else {
            Self::Nominal
        }
    }
}

impl std::fmt::Display for NodeLoadLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nominal => write!(f, "nominal"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Snapshot of fabric accounting across active sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricMetrics {
    /// Aggregate bandwidth of every link in the fabric (GB/s)
    pub total_bandwidth: f64,
    /// Bandwidth allocated to currently active sessions
    pub allocated_bandwidth: f64,
    /// Number of active sessions
    pub active_session_count: usize,
    /// Per-node share of allocated bandwidth over node capacity, indexed by node id
    pub node_utilization: Vec<f64>,
}

impl FabricMetrics {
    /// Compute metrics from `(allocated_bandwidth, participant_nodes)` pairs.
    ///
    /// A session's allocation is split evenly across the nodes its
    /// participants occupy.
    pub fn compute<I>(topology: &FabricTopology, loads: I) -> Self
    where
        I: IntoIterator<Item = (f64, Vec<NodeId>)>,
    {
        let mut per_node = vec![0.0f64; topology.node_count()];
        let mut allocated_bandwidth = 0.0;
        let mut active_session_count = 0;

        for (bandwidth, nodes) in loads {
            active_session_count += 1;
            allocated_bandwidth += bandwidth;

            if nodes.is_empty() {
                continue;
            }
            let share = bandwidth / nodes.len() as f64;
            for node in nodes {
                if let Some(slot) = per_node.get_mut(node) {
                    *slot += share;
                }
            }
        }

        let node_utilization = per_node
            .into_iter()
            .enumerate()
            .map(|(node, load)| match topology.node_capacity(node) {
                Some(capacity) if capacity > 0.0 => load / capacity,
                _ => 0.0,
            })
            .collect();

        Self {
            total_bandwidth: topology.total_bandwidth(),
            allocated_bandwidth,
            active_session_count,
            node_utilization,
        }
    }

    /// Load band per node
    pub fn load_levels(&self) -> Vec<NodeLoadLevel> {
        self.node_utilization
            .iter()
            .map(|&u| NodeLoadLevel::from_utilization(u))
            .collect()
    }

    /// Nodes whose utilization exceeds `threshold`
    pub fn saturated_nodes(&self, threshold: f64) -> Vec<NodeId> {
        self.node_utilization
            .iter()
            .enumerate()
            .filter(|&(_, &u)| u > threshold)
            .map(|(node, _)| node)
            .collect()
    }
}
