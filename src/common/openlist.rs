use super::NodeId;
use crate::error::PlanningError;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Open,
    Closed,
}

// Authoritative membership record of a node. Nodes never enqueued have none.
#[derive(Debug, Clone, Copy)]
struct OpenListData {
    state: NodeState,
    cost: f64,
}

// Heap entry. Entries may be stale: only the entry whose cost matches the
// node's current record while the node is open is trusted.
#[derive(Debug, Clone, Copy)]
struct OpenOrderEntry {
    node: NodeId,
    cost: f64,
    sequence: u64,
}

impl PartialEq for OpenOrderEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenOrderEntry {}

impl PartialOrd for OpenOrderEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenOrderEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: lower cost first, then first in first out.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Priority queue of frontier nodes keyed by f-cost, with lazy deletion.
///
/// `update_costs` pushes a fresh heap entry instead of removing the old one;
/// outdated entries are discarded by `remove_min` and `is_empty` after
/// checking them against the per-node state table.
#[derive(Debug, Default)]
pub struct OpenList {
    heap: BinaryHeap<OpenOrderEntry>,
    data: HashMap<NodeId, OpenListData>,
    sequence: u64,
    duplicate_warning: bool,
    reinsert_warning: bool,
}

impl OpenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `node` on the open list with f-cost `cost`.
    pub fn enqueue(&mut self, node: NodeId, cost: f64) -> Result<(), PlanningError> {
        if cost.is_nan() {
            return Err(PlanningError::InvalidArgument(format!(
                "OpenList::enqueue(): cost of {node:?} is NaN"
            )));
        }
        trace!("enqueue {node:?} with cost {cost}");

        match self.data.get(&node).map(|d| d.state) {
            Some(NodeState::Open) if !self.duplicate_warning => {
                warn!("adding node {node:?} multiple times to the open list, use update_costs() to change its costs");
                self.duplicate_warning = true;
            }
            Some(NodeState::Closed) if !self.reinsert_warning => {
                warn!("re-adding node {node:?} that has already been removed from the open list");
                self.reinsert_warning = true;
            }
            _ => {}
        }

        self.data.insert(
            node,
            OpenListData {
                state: NodeState::Open,
                cost,
            },
        );
        self.push(node, cost);
        Ok(())
    }

    /// Lowers (or raises) the f-cost of a node that is currently open.
    pub fn update_costs(&mut self, node: NodeId, cost: f64) -> Result<(), PlanningError> {
        if cost.is_nan() {
            return Err(PlanningError::InvalidArgument(format!(
                "OpenList::update_costs(): cost of {node:?} is NaN"
            )));
        }
        match self.data.get_mut(&node) {
            Some(d) if d.state == NodeState::Open => d.cost = cost,
            _ => {
                return Err(PlanningError::NodeNotOpen {
                    node,
                    operation: "OpenList::update_costs()",
                })
            }
        }
        trace!("update {node:?} to cost {cost}");
        self.push(node, cost);
        Ok(())
    }

    /// Removes and returns the open node with the lowest f-cost. The node is
    /// marked closed and will not be returned again.
    pub fn remove_min(&mut self) -> Result<NodeId, PlanningError> {
        while let Some(entry) = self.heap.pop() {
            if !self.is_live(&entry) {
                continue;
            }
            if let Some(d) = self.data.get_mut(&entry.node) {
                d.state = NodeState::Closed;
            }
            return Ok(entry.node);
        }
        Err(PlanningError::EmptyOpenList)
    }

    /// True iff no open node remains. Discards stale entries on the way.
    pub fn is_empty(&mut self) -> bool {
        while let Some(top) = self.heap.peek() {
            if self.is_live(top) {
                return false;
            }
            self.heap.pop();
        }
        true
    }

    pub fn contains(&self, node: NodeId) -> bool {
        matches!(
            self.data.get(&node),
            Some(OpenListData {
                state: NodeState::Open,
                ..
            })
        )
    }

    /// The f-cost currently tracked for an open node.
    pub fn costs(&self, node: NodeId) -> Result<f64, PlanningError> {
        match self.data.get(&node) {
            Some(d) if d.state == NodeState::Open => Ok(d.cost),
            _ => Err(PlanningError::NodeNotOpen {
                node,
                operation: "OpenList::costs()",
            }),
        }
    }

    /// Number of heap entries, stale ones included.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    fn push(&mut self, node: NodeId, cost: f64) {
        self.heap.push(OpenOrderEntry {
            node,
            cost,
            sequence: self.sequence,
        });
        self.sequence += 1;
    }

    fn is_live(&self, entry: &OpenOrderEntry) -> bool {
        match self.data.get(&entry.node) {
            Some(d) => d.state == NodeState::Open && d.cost.to_bits() == entry.cost.to_bits(),
            None => false,
        }
    }
}
