mod closedlist;
mod openlist;
mod tree;

pub use closedlist::ClosedList;
pub use openlist::OpenList;
pub use tree::SearchTree;

use crate::error::PlanningError;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Handle of a canonical node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Sequence of nodes from the start to the last node reached. Empty when no
/// path exists.
pub type Path = Vec<NodeId>;

/// A domain coordinate that can be interned into a [`NodeArena`].
pub trait SearchNode: Clone + fmt::Debug + fmt::Display {
    /// Two nodes with the same key are the same node.
    type Key: Hash + Eq + Clone + fmt::Debug;

    fn key(&self) -> Self::Key;

    /// One line of the path log.
    fn to_log_string(&self) -> String;
}

/// Nodes with a planar position in a common metric frame.
pub trait Planar {
    fn position(&self) -> (f64, f64);

    fn planar_distance(&self, other: &impl Planar) -> f64 {
        let (x1, y1) = self.position();
        let (x2, y2) = other.position();
        (x1 - x2).hypot(y1 - y2)
    }
}

/// Canonicalization arena: one logical coordinate always maps to one
/// [`NodeId`]. Nodes are never removed while the arena lives.
#[derive(Debug, Clone)]
pub struct NodeArena<N: SearchNode> {
    nodes: Vec<N>,
    index: HashMap<N::Key, NodeId>,
}

impl<N: SearchNode> Default for NodeArena<N> {
    fn default() -> Self {
        NodeArena {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<N: SearchNode> NodeArena<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle of `node`, allocating it on first request.
    pub fn intern(&mut self, node: N) -> NodeId {
        let key = node.key();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        self.index.insert(key, id);
        id
    }

    /// Looks up a node without allocating it.
    pub fn find(&self, key: &N::Key) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn node(&self, id: NodeId) -> Result<&N, PlanningError> {
        self.nodes
            .get(id.index())
            .ok_or(PlanningError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
