use super::{Domain, Inflatable};
use crate::common::{NodeArena, NodeId, Planar, SearchNode};
use crate::error::PlanningError;
use crate::heuristic::Heuristic;
use crate::map::GridMap;

use std::fmt;

/// A cell of a [`GridMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridNode {
    pub x: i32,
    pub y: i32,
}

impl GridNode {
    pub fn new(x: i32, y: i32) -> Self {
        GridNode { x, y }
    }
}

impl fmt::Display for GridNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Planar for GridNode {
    fn position(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

impl SearchNode for GridNode {
    type Key = (i32, i32);

    fn key(&self) -> Self::Key {
        (self.x, self.y)
    }

    fn to_log_string(&self) -> String {
        format!("{} {}", self.x, self.y)
    }
}

/// 8-connected movement over the free cells of a map.
#[derive(Debug, Clone)]
pub struct GridDomain<H> {
    map: GridMap,
    heuristic: H,
    arena: NodeArena<GridNode>,
}

impl<H> GridDomain<H> {
    pub fn new(map: GridMap, heuristic: H) -> Self {
        GridDomain {
            map,
            heuristic,
            arena: NodeArena::new(),
        }
    }

    /// Handle of cell `(x, y)`. No bounds check, planning from outside the
    /// map simply finds no path.
    pub fn node_at(&mut self, x: i32, y: i32) -> NodeId {
        self.arena.intern(GridNode::new(x, y))
    }

    pub fn find(&self, x: i32, y: i32) -> Option<NodeId> {
        self.arena.find(&(x, y))
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn arena(&self) -> &NodeArena<GridNode> {
        &self.arena
    }
}

impl<H: Heuristic<GridNode>> Domain for GridDomain<H> {
    type Node = GridNode;

    fn node(&self, id: NodeId) -> Result<&GridNode, PlanningError> {
        self.arena.node(id)
    }

    fn neighbor_nodes(&mut self, current: NodeId) -> Result<Vec<NodeId>, PlanningError> {
        let GridNode { x, y } = *self.arena.node(current)?;
        let mut neighbors = Vec::with_capacity(8);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (nx, ny) = (x + dx, y + dy);
                if !self.map.in_bounds(nx, ny) || self.map.is_occupied(nx, ny)? {
                    continue;
                }
                neighbors.push(self.arena.intern(GridNode::new(nx, ny)));
            }
        }
        Ok(neighbors)
    }

    fn costs(&self, current: NodeId, successor: NodeId) -> Result<f64, PlanningError> {
        let (a, b) = (self.arena.node(current)?, self.arena.node(successor)?);
        Ok(a.planar_distance(b))
    }

    fn heuristic(&self, current: NodeId, goal: NodeId) -> Result<f64, PlanningError> {
        let (a, b) = (self.arena.node(current)?, self.arena.node(goal)?);
        Ok(self.heuristic.heuristic(a, b))
    }

    fn is_close_to_goal(&self, current: NodeId, goal: NodeId) -> Result<bool, PlanningError> {
        Ok(self.arena.node(current)? == self.arena.node(goal)?)
    }
}

impl<H: Inflatable> Inflatable for GridDomain<H> {
    fn w(&self) -> f64 {
        self.heuristic.w()
    }

    fn set_w(&mut self, w: f64) -> Result<(), PlanningError> {
        self.heuristic.set_w(w)
    }
}
