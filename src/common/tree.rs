use super::{NodeId, Path};
use crate::error::PlanningError;

use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct NodeRecord {
    costs: f64,
    predecessor: Option<NodeId>,
}

impl Default for NodeRecord {
    fn default() -> Self {
        NodeRecord {
            costs: 0.0,
            predecessor: None,
        }
    }
}

/// Search state of one planning episode: the best known g-value of every
/// reached node and the predecessor that achieved it.
#[derive(Debug, Default, Clone)]
pub struct SearchTree {
    records: HashMap<NodeId, NodeRecord>,
}

impl SearchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best known g-value, 0 for nodes never touched in this episode.
    pub fn costs(&self, node: NodeId) -> f64 {
        self.records.get(&node).map_or(0.0, |r| r.costs)
    }

    pub fn set_costs(&mut self, node: NodeId, costs: f64) {
        self.records.entry(node).or_default().costs = costs;
    }

    pub fn predecessor(&self, node: NodeId) -> Option<NodeId> {
        self.records.get(&node).and_then(|r| r.predecessor)
    }

    pub fn set_predecessor(&mut self, node: NodeId, predecessor: NodeId) -> Result<(), PlanningError> {
        if node == predecessor {
            return Err(PlanningError::SelfPredecessor(node));
        }
        self.records.entry(node).or_default().predecessor = Some(predecessor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Walks the predecessor chain back from `node` and returns it in
    /// start-to-`node` order.
    pub fn follow_path(&self, node: NodeId) -> Result<Path, PlanningError> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(prev) = self.predecessor(current) {
            // A chain longer than the number of records must revisit a node.
            if path.len() > self.records.len() {
                return Err(PlanningError::PredecessorCycle(node));
            }
            path.push(prev);
            current = prev;
        }
        path.reverse();
        Ok(path)
    }
}
