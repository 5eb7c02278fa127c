//! Resource fabric module
//!
//! Models the interconnect that coordination workloads are placed onto as a
//! static, fixed-degree graph. The fabric is read-only after construction and
//! is shared by the placement optimizer and the session registry.
//!
//! ```text
//!       4 ───── 5
//!      ╱│      ╱│
//!     0 ───── 1 │        default fabric: 3-dimensional hypercube,
//!     │ 6 ────│─ 7       8 nodes, degree 3, 900 GB/s per link
//!     │╱      │╱
//!     2 ───── 3
//! ```

pub mod metrics;
pub mod topology;

use serde::{Deserialize, Serialize};

pub use metrics::{FabricMetrics, NodeLoadLevel, CRITICAL_UTILIZATION, WARNING_UTILIZATION};
pub use topology::{FabricSummary, FabricTopology, NodeId, TopologyError, TopologyNode};

/// Per-link bandwidth of the default fabric (GB/s)
pub const DEFAULT_LINK_BANDWIDTH: f64 = 900.0;

/// Dimension of the default hypercube fabric
pub const DEFAULT_HYPERCUBE_DIMENSION: u32 = 3;

/// Declarative topology description used by configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologySpec {
    Hypercube {
        dimension: u32,
        link_bandwidth: f64,
    },
    FullMesh {
        node_count: usize,
        link_bandwidth: f64,
    },
    Ring {
        node_count: usize,
        link_bandwidth: f64,
    },
    Adjacency {
        neighbors: Vec<Vec<NodeId>>,
        link_bandwidth: f64,
    },
}

impl TopologySpec {
    /// Build and validate the described fabric
    pub fn build(&self) -> Result<FabricTopology, TopologyError> {
        match self {
            Self::Hypercube {
                dimension,
                link_bandwidth,
            } => FabricTopology::hypercube(*dimension, *link_bandwidth),
            Self::FullMesh {
                node_count,
                link_bandwidth,
            } => FabricTopology::full_mesh(*node_count, *link_bandwidth),
            Self::Ring {
                node_count,
                link_bandwidth,
            } => FabricTopology::ring(*node_count, *link_bandwidth),
            Self::Adjacency {
                neighbors,
                link_bandwidth,
            } => FabricTopology::from_adjacency(neighbors.clone(), *link_bandwidth),
        }
    }
}

impl Default for TopologySpec {
    fn default() -> Self {
        Self::Hypercube {
            dimension: DEFAULT_HYPERCUBE_DIMENSION,
            link_bandwidth: DEFAULT_LINK_BANDWIDTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_builds_eight_nodes() {
        let fabric = TopologySpec::default().build().unwrap();
        assert_eq!(fabric.node_count(), 8);
        assert_eq!(fabric.degree(), 3);
    }

    #[test]
    fn test_spec_serde_tagging() {
        let spec: TopologySpec =
            serde_json::from_str(r#"{"kind":"full_mesh","node_count":4,"link_bandwidth":10.0}"#)
                .unwrap();
        assert_eq!(
            spec,
            TopologySpec::FullMesh {
                node_count: 4,
                link_bandwidth: 10.0
            }
        );
        assert_eq!(spec.build().unwrap().degree(), 3);
    }
}
