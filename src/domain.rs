pub mod footstep;
pub mod grid;

use crate::common::{NodeId, SearchNode};
use crate::error::PlanningError;

/// Everything the search drivers need to know about a state space.
///
/// Nodes are addressed by [`NodeId`] handles issued by the domain's own
/// arena. Passing a handle the domain never issued is an
/// [`PlanningError::UnknownNode`] error.
pub trait Domain {
    type Node: SearchNode;

    fn node(&self, id: NodeId) -> Result<&Self::Node, PlanningError>;

    /// Successors of `current`. Takes `&mut self` because new successors are
    /// interned on first sight.
    fn neighbor_nodes(&mut self, current: NodeId) -> Result<Vec<NodeId>, PlanningError>;

    /// Step costs from `current` to the adjacent `successor`.
    fn costs(&self, current: NodeId, successor: NodeId) -> Result<f64, PlanningError>;

    fn heuristic(&self, current: NodeId, goal: NodeId) -> Result<f64, PlanningError>;

    fn is_close_to_goal(&self, current: NodeId, goal: NodeId) -> Result<bool, PlanningError>;
}

/// Something carrying a heuristic inflation factor.
pub trait Inflatable {
    fn w(&self) -> f64;

    fn set_w(&mut self, w: f64) -> Result<(), PlanningError>;
}
