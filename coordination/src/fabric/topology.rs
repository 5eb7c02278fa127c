//! Static interconnect topology
//!
//! A fixed-degree, symmetric graph of fabric nodes. Every node carries the
//! same number of links; hop distances between all node pairs are computed
//! once at construction and never change afterwards.

use std::collections::BTreeSet;

use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

/// Index of a node in the fabric (`0..node_count`)
pub type NodeId = usize;

/// Errors raised while validating a topology
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("Topology has no nodes")]
    Empty,

    #[error("Node ids must be sequential: expected {expected}, found {found}")]
    NonSequentialId { expected: NodeId, found: NodeId },

    #[error("Degree {degree} is not realizable on {node_count} nodes")]
    InvalidDegree { node_count: usize, degree: usize },

    #[error("Node {node} has {actual} neighbors, expected {expected}")]
    DegreeMismatch {
        node: NodeId,
        expected: usize,
        actual: usize,
    },

    #[error("Node {node} lists itself as a neighbor")]
    SelfLoop { node: NodeId },

    #[error("Node {node} references unknown neighbor {neighbor}")]
    UnknownNeighbor { node: NodeId, neighbor: NodeId },

    #[error("Link {from} -> {to} has no reverse link")]
    Asymmetric { from: NodeId, to: NodeId },

    #[error("Node {node} has invalid link bandwidth {bandwidth}")]
    InvalidBandwidth { node: NodeId, bandwidth: f64 },

    #[error("Topology is disconnected: {reachable} of {node_count} nodes reachable from node {from}")]
    Disconnected {
        from: NodeId,
        reachable: usize,
        node_count: usize,
    },
}

/// A single fabric node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyNode {
    /// Node index
    pub id: NodeId,
    /// Adjacent nodes
    pub neighbors: BTreeSet<NodeId>,
    /// Per-link bandwidth in GB/s
    pub link_bandwidth: f64,
}

impl TopologyNode {
    pub fn new(id: NodeId, neighbors: impl IntoIterator<Item = NodeId>, link_bandwidth: f64) -> Self {
        Self {
            id,
            neighbors: neighbors.into_iter().collect(),
            link_bandwidth,
        }
    }
}

/// Read-only fabric graph with precomputed hop distances
#[derive(Debug, Clone)]
pub struct FabricTopology {
    nodes: Vec<TopologyNode>,
    degree: usize,
    hops: Vec<Vec<u32>>,
}

impl FabricTopology {
    /// Validate and build a topology from explicit nodes
    pub fn new(nodes: Vec<TopologyNode>) -> Result<Self, TopologyError> {
        if nodes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let node_count = nodes.len();
        for (expected, node) in nodes.iter().enumerate() {
            if node.id != expected {
                return Err(TopologyError::NonSequentialId {
                    expected,
                    found: node.id,
                });
            }
        }

        let degree = nodes[0].neighbors.len();
        for node in &nodes {
            if node.neighbors.len() != degree {
                return Err(TopologyError::DegreeMismatch {
                    node: node.id,
                    expected: degree,
                    actual: node.neighbors.len(),
                });
            }
        }

        // A k-regular graph on N nodes needs k < N and an even number of link endpoints
        if degree >= node_count || (node_count * degree) % 2 != 0 {
            return Err(TopologyError::InvalidDegree { node_count, degree });
        }

        for node in &nodes {
            if !node.link_bandwidth.is_finite() || node.link_bandwidth <= 0.0 {
                return Err(TopologyError::InvalidBandwidth {
                    node: node.id,
                    bandwidth: node.link_bandwidth,
                });
            }
            for &neighbor in &node.neighbors {
                if neighbor == node.id {
                    return Err(TopologyError::SelfLoop { node: node.id });
                }
                if neighbor >= node_count {
                    return Err(TopologyError::UnknownNeighbor {
                        node: node.id,
                        neighbor,
                    });
                }
                if !nodes[neighbor].neighbors.contains(&node.id) {
                    return Err(TopologyError::Asymmetric {
                        from: node.id,
                        to: neighbor,
                    });
                }
            }
        }

        let hops = Self::all_pairs_hops(&nodes)?;

        Ok(Self {
            nodes,
            degree,
            hops,
        })
    }

    /// Every node linked to every other node
    pub fn full_mesh(node_count: usize, link_bandwidth: f64) -> Result<Self, TopologyError> {
        let nodes = (0..node_count)
            .map(|id| TopologyNode::new(id, (0..node_count).filter(|&n| n != id), link_bandwidth))
            .collect();
        Self::new(nodes)
    }

    /// Bidirectional ring (degree 2)
    pub fn ring(node_count: usize, link_bandwidth: f64) -> Result<Self, TopologyError> {
        let nodes = (0..node_count)
            .map(|id| {
                let next = (id + 1) % node_count;
                let prev = (id + node_count - 1) % node_count;
                TopologyNode::new(id, [next, prev], link_bandwidth)
            })
            .collect();
        Self::new(nodes)
    }

    /// Binary hypercube with `2^dimension` nodes (degree = dimension)
    pub fn hypercube(dimension: u32, link_bandwidth: f64) -> Result<Self, TopologyError> {
        let node_count = 1usize << dimension;
        let nodes = (0..node_count)
            .map(|id| {
                TopologyNode::new(id, (0..dimension).map(|bit| id ^ (1 << bit)), link_bandwidth)
            })
            .collect();
        Self::new(nodes)
    }

    /// Build from adjacency lists with uniform link bandwidth
    pub fn from_adjacency(
        adjacency: Vec<Vec<NodeId>>,
        link_bandwidth: f64,
    ) -> Result<Self, TopologyError> {
        let nodes = adjacency
            .into_iter()
            .enumerate()
            .map(|(id, neighbors)| TopologyNode::new(id, neighbors, link_bandwidth))
            .collect();
        Self::new(nodes)
    }

    fn all_pairs_hops(nodes: &[TopologyNode]) -> Result<Vec<Vec<u32>>, TopologyError> {
        let node_count = nodes.len();
        let mut graph = UnGraph::<NodeId, ()>::with_capacity(node_count, node_count * 4);
        let indices: Vec<NodeIndex> = (0..node_count).map(|id| graph.add_node(id)).collect();

        for node in nodes {
            for &neighbor in node.neighbors.iter().filter(|&&n| n > node.id) {
                graph.add_edge(indices[node.id], indices[neighbor], ());
            }
        }

        let mut hops = vec![vec![0u32; node_count]; node_count];
        for from in 0..node_count {
            let distances = dijkstra(&graph, indices[from], None, |_| 1u32);
            if distances.len() != node_count {
                return Err(TopologyError::Disconnected {
                    from,
                    reachable: distances.len(),
                    node_count,
                });
            }
            for (index, distance) in distances {
                hops[from][graph[index]] = distance;
            }
        }

        Ok(hops)
    }

    /// Number of nodes in the fabric
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Links per node
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn nodes(&self) -> &[TopologyNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&TopologyNode> {
        self.nodes.get(id)
    }

    /// Neighbors of a node, or `None` for an unknown node
    pub fn neighbors_of(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.nodes.get(id).map(|n| &n.neighbors)
    }

    /// Bandwidth of the direct link between two nodes, `None` if not adjacent
    pub fn link_bandwidth(&self, a: NodeId, b: NodeId) -> Option<f64> {
        let node_a = self.nodes.get(a)?;
        let node_b = self.nodes.get(b)?;
        if !node_a.neighbors.contains(&b) {
            return None;
        }
        Some(node_a.link_bandwidth.min(node_b.link_bandwidth))
    }

    /// Shortest-path hop count between two nodes
    pub fn hop_distance(&self, a: NodeId, b: NodeId) -> Option<u32> {
        self.hops.get(a).and_then(|row| row.get(b)).copied()
    }

    /// Aggregate link bandwidth terminating at a node
    pub fn node_capacity(&self, id: NodeId) -> Option<f64> {
        self.nodes
            .get(id)
            .map(|n| n.link_bandwidth * n.neighbors.len() as f64)
    }

    /// Sum of bandwidth over every unique link
    pub fn total_bandwidth(&self) -> f64 {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.neighbors
                    .iter()
                    .filter(move |&&n| n > node.id)
                    .map(move |&n| (node.id, n))
            })
            .filter_map(|(a, b)| self.link_bandwidth(a, b))
            .sum()
    }

    /// Longest shortest path in the fabric
    pub fn diameter(&self) -> u32 {
        self.hops
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Serializable overview for operators
    pub fn summary(&self) -> FabricSummary {
        FabricSummary {
            node_count: self.node_count(),
            degree: self.degree,
            diameter: self.diameter(),
            total_bandwidth: self.total_bandwidth(),
            nodes: self.nodes.clone(),
        }
    }
}

/// Operator-facing description of a fabric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricSummary {
    pub node_count: usize,
    pub degree: usize,
    pub diameter: u32,
    pub total_bandwidth: f64,
    pub nodes: Vec<TopologyNode>,
}
