//! Placement of workloads onto fabric nodes
//!
//! Placement is computed fresh for every coordination request and is never
//! persisted. Assignment is stable on input order: priority only affects
//! primary selection, never which node a workload lands on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fabric::NodeId;

/// Preferred node for the coordinator workload
pub const COORDINATOR_NODE: NodeId = 0;

/// Errors raised by the placement optimizer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("{requested} workloads exceed fabric capacity of {available} nodes")]
    InsufficientCapacity { requested: usize, available: usize },

    #[error("Workload {0} requested more than once")]
    DuplicateWorkload(String),
}

/// One workload pinned to one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub workload_id: String,
    pub node: NodeId,
}

/// Workload to node mapping, unique per node, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    assignments: Vec<Assignment>,
}

impl Placement {
    /// Node assigned to a workload
    pub fn node_of(&self, workload_id: &str) -> Option<NodeId> {
        self.assignments
            .iter()
            .find(|a| a.workload_id == workload_id)
            .map(|a| a.node)
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Occupied nodes in request order
    pub fn nodes(&self) -> Vec<NodeId> {
        self.assignments.iter().map(|a| a.node).collect()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Assigns workloads to distinct fabric nodes
#[derive(Debug, Clone)]
pub struct PlacementOptimizer {
    node_count: usize,
    coordinator: Option<String>,
}

impl PlacementOptimizer {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            coordinator: None,
        }
    }

    /// Pin the given workload to the coordinator node when it is placed
    pub fn with_coordinator(mut self, coordinator: Option<String>) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Place workloads in caller order.
    ///
    /// Each workload takes the lowest-index free node. The coordinator is
    /// pinned to node 0 if that node is still free, else it falls back to the
    /// lowest free node like everyone else.
    pub fn place(&self, workload_ids: &[String]) -> Result<Placement, PlacementError> {
        if workload_ids.len() > self.node_count {
            return Err(PlacementError::InsufficientCapacity {
                requested: workload_ids.len(),
                available: self.node_count,
            });
        }

        let mut seen = HashSet::with_capacity(workload_ids.len());
        for id in workload_ids {
            if !seen.insert(id.as_str()) {
                return Err(PlacementError::DuplicateWorkload(id.clone()));
            }
        }

        let coordinator = self
            .coordinator
            .as_deref()
            .filter(|c| workload_ids.iter().any(|id| id == c));

        let mut used = vec![false; self.node_count];
        let mut assignments = Vec::with_capacity(workload_ids.len());

        for id in workload_ids {
            let is_coordinator = coordinator == Some(id.as_str());
            let node = if is_coordinator && !used[COORDINATOR_NODE] {
                Some(COORDINATOR_NODE)
            } else {
                (0..self.node_count).find(|&n| !used[n])
            };

            let node = node.ok_or(PlacementError::InsufficientCapacity {
                requested: workload_ids.len(),
                available: self.node_count,
            })?;

            used[node] = true;
            assignments.push(Assignment {
                workload_id: id.clone(),
                node,
            });
        }

        debug!(
            workloads = assignments.len(),
            coordinator = coordinator.unwrap_or("none"),
            "Placement computed"
        );

        Ok(Placement { assignments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assigns_lowest_free_nodes_in_input_order() {
        let optimizer = PlacementOptimizer::new(8);
        let placement = optimizer.place(&ids(&["a", "b", "c"])).unwrap();

        assert_eq!(placement.node_of("a"), Some(0));
        assert_eq!(placement.node_of("b"), Some(1));
        assert_eq!(placement.node_of("c"), Some(2));
        assert_eq!(placement.node_of("d"), None);
    }

    #[test]
    fn test_coordinator_pinned_to_node_zero() {
        let optimizer = PlacementOptimizer::new(8).with_coordinator(Some("ceo".to_string()));
        let placement = optimizer.place(&ids(&["ceo", "cfo", "cto"])).unwrap();

        assert_eq!(placement.node_of("ceo"), Some(0));
        assert_eq!(placement.node_of("cfo"), Some(1));
        assert_eq!(placement.node_of("cto"), Some(2));
    }

    #[test]
    fn test_coordinator_falls_back_when_node_zero_taken() {
        let optimizer = PlacementOptimizer::new(8).with_coordinator(Some("ceo".to_string()));
        let placement = optimizer.place(&ids(&["cfo", "cto", "ceo"])).unwrap();

        assert_eq!(placement.node_of("cfo"), Some(0));
        assert_eq!(placement.node_of("cto"), Some(1));
        assert_eq!(placement.node_of("ceo"), Some(2));

        let placement = optimizer.place(&ids(&["cfo", "ceo"])).unwrap();
        assert_eq!(placement.node_of("cfo"), Some(0));
        assert_eq!(placement.node_of("ceo"), Some(1));
    }

    #[test]
    fn test_absent_coordinator_does_not_reserve_node_zero() {
        let optimizer = PlacementOptimizer::new(4).with_coordinator(Some("ceo".to_string()));
        let placement = optimizer.place(&ids(&["cfo", "cto"])).unwrap();
        assert_eq!(placement.nodes(), vec![0, 1]);
    }

    #[test]
    fn test_full_fabric_with_coordinator_last() {
        let optimizer = PlacementOptimizer::new(3).with_coordinator(Some("ceo".to_string()));
        let placement = optimizer.place(&ids(&["a", "b", "ceo"])).unwrap();
        assert_eq!(placement.nodes(), vec![0, 1, 2]);
    }

    #[test]
    fn test_insufficient_capacity() {
        let optimizer = PlacementOptimizer::new(2);
        let result = optimizer.place(&ids(&["a", "b", "c"]));
        assert_eq!(
            result.unwrap_err(),
            PlacementError::InsufficientCapacity {
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let optimizer = PlacementOptimizer::new(4);
        let result = optimizer.place(&ids(&["a", "a"]));
        assert_eq!(result.unwrap_err(), PlacementError::DuplicateWorkload("a".to_string()));
    }

    #[test]
    fn test_nodes_distinct_and_in_range_for_every_prefix() {
        let names: Vec<String> = (0..8).map(|i| format!("w{}", i)).collect();
        for coordinator in [None, Some("w5".to_string())] {
            let optimizer = PlacementOptimizer::new(8).with_coordinator(coordinator);
            for len in 0..=names.len() {
                let placement = optimizer.place(&names[..len]).unwrap();
                let nodes = placement.nodes();
                let unique: HashSet<_> = nodes.iter().collect();
                assert_eq!(unique.len(), len);
                assert!(nodes.iter().all(|&n| n < 8));
            }
        }
    }

    #[test]
    fn test_empty_request() {
        let placement = PlacementOptimizer::new(8).place(&[]).unwrap();
        assert!(placement.is_empty());
    }
}
