use super::NodeId;

use std::collections::HashSet;
use tracing::{trace, warn};

/// Nodes that have been expanded and must not be expanded again.
#[derive(Debug, Default)]
pub struct ClosedList {
    list: HashSet<NodeId>,
    duplicate_warning: bool,
}

impl ClosedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: NodeId) {
        trace!("close {node:?}");
        if !self.list.insert(node) && !self.duplicate_warning {
            warn!("adding node {node:?} multiple times to the closed list");
            self.duplicate_warning = true;
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.list.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
