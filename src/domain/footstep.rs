use super::{Domain, Inflatable};
use crate::common::{NodeArena, NodeId, Planar, SearchNode};
use crate::error::PlanningError;
use crate::heuristic::{FootstepDistance, Heuristic};
use crate::map::ObstacleDistance;

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Footsteps closer than this to an obstacle collide.
pub const COLLISION_DISTANCE: f64 = 0.01;

/// A footstep closer than this to the goal position reaches it.
pub const GOAL_DISTANCE: f64 = 0.10;

/// A footstep turned less than this against the goal reaches it.
pub const GOAL_ANGLE: f64 = 0.25 * PI;

// Grid used to canonicalize footstep poses, in meters and radians.
const POSITION_RESOLUTION: f64 = 0.01;
const ANGLE_RESOLUTION: f64 = 0.01;

/// Wraps an angle into `(-pi, pi]`.
pub fn normalize_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Signed angle to turn from `from` to `to`, in `(-pi, pi]`.
pub fn shortest_angular_distance(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Foot {
    Left,
    Right,
}

impl Foot {
    pub fn opposite(self) -> Foot {
        match self {
            Foot::Left => Foot::Right,
            Foot::Right => Foot::Left,
        }
    }
}

impl fmt::Display for Foot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Foot::Left => write!(f, "left"),
            Foot::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Foot {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Foot::Left),
            "right" | "r" => Ok(Foot::Right),
            _ => Err(PlanningError::InvalidArgument(format!("unknown foot {s:?}"))),
        }
    }
}

/// Pose of a placed foot. `theta` is kept in `(-pi, pi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootstepNode {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub foot: Foot,
}

impl FootstepNode {
    pub fn new(x: f64, y: f64, theta: f64, foot: Foot) -> Self {
        FootstepNode {
            x,
            y,
            theta: normalize_angle(theta),
            foot,
        }
    }

    /// Same foot and pose within the canonicalization resolution.
    pub fn approx_eq(&self, other: &FootstepNode) -> bool {
        self.foot == other.foot
            && (self.x - other.x).abs() < POSITION_RESOLUTION
            && (self.y - other.y).abs() < POSITION_RESOLUTION
            && shortest_angular_distance(self.theta, other.theta).abs() < ANGLE_RESOLUTION
    }

    /// Places the foot `action.foot` relative to this footstep.
    ///
    /// The displacement is turned clockwise by `theta`:
    /// `x' = x + dx cos(theta) + dy sin(theta)`,
    /// `y' = y - dx sin(theta) + dy cos(theta)`.
    pub fn execute(&self, action: &FootstepAction) -> FootstepNode {
        let (sin, cos) = self.theta.sin_cos();
        FootstepNode::new(
            self.x + action.dx * cos + action.dy * sin,
            self.y - action.dx * sin + action.dy * cos,
            self.theta + action.dtheta,
            action.foot,
        )
    }
}

impl fmt::Display for FootstepNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}, {})",
            self.x, self.y, self.theta, self.foot
        )
    }
}

impl Planar for FootstepNode {
    fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl SearchNode for FootstepNode {
    type Key = (i64, i64, i64, Foot);

    fn key(&self) -> Self::Key {
        (
            (self.x / POSITION_RESOLUTION).round() as i64,
            (self.y / POSITION_RESOLUTION).round() as i64,
            theta_index(self.theta),
            self.foot,
        )
    }

    fn to_log_string(&self) -> String {
        format!("{} {} {} {}", self.x, self.y, self.theta, self.foot)
    }
}

// Quantized heading. -PI and PI describe the same heading and share an index.
fn theta_index(theta: f64) -> i64 {
    let half_turn = (PI / ANGLE_RESOLUTION).round() as i64;
    let index = (normalize_angle(theta) / ANGLE_RESOLUTION).round() as i64;
    if index <= -half_turn {
        index + 2 * half_turn
    } else {
        index
    }
}

/// Motion primitive: where to put `foot` relative to the other foot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootstepAction {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
    pub foot: Foot,
}

// (dx, dy, dtheta) for the right foot. The left table negates dy and dtheta.
const RIGHT_ACTIONS: [(f64, f64, f64); 12] = [
    (0.0, 0.16, 0.0),
    (0.08, 0.09, 0.0),
    (-0.04, 0.09, 0.0),
    (0.0, 0.12, 0.0),
    (0.05, 0.14, 0.0),
    (0.01, 0.13, -0.5),
    (0.015, 0.100, 0.5),
    (0.04, 0.12, 0.3),
    (-0.03, 0.12, 0.5),
    (0.06, 0.12, 0.0),
    (0.04, 0.10, 0.0),
    (-0.02, 0.12, 0.0),
];

impl FootstepAction {
    pub fn new(dx: f64, dy: f64, dtheta: f64, foot: Foot) -> Self {
        FootstepAction {
            dx,
            dy,
            dtheta,
            foot,
        }
    }

    /// The twelve primitives for stepping with `foot`.
    pub fn table(foot: Foot) -> Vec<FootstepAction> {
        let c = match foot {
            Foot::Right => 1.0,
            Foot::Left => -1.0,
        };
        RIGHT_ACTIONS
            .iter()
            .map(|&(dx, dy, dtheta)| FootstepAction::new(dx, c * dy, c * dtheta, foot))
            .collect()
    }
}

/// Biped footstep placement on a map with clearance information.
#[derive(Debug, Clone)]
pub struct FootstepDomain<M, H = FootstepDistance> {
    map: M,
    heuristic: H,
    arena: NodeArena<FootstepNode>,
    left_actions: Vec<FootstepAction>,
    right_actions: Vec<FootstepAction>,
}

impl<M: ObstacleDistance, H> FootstepDomain<M, H> {
    pub fn new(map: M, heuristic: H) -> Self {
        FootstepDomain {
            map,
            heuristic,
            arena: NodeArena::new(),
            left_actions: FootstepAction::table(Foot::Left),
            right_actions: FootstepAction::table(Foot::Right),
        }
    }

    pub fn node_at(&mut self, x: f64, y: f64, theta: f64, foot: Foot) -> NodeId {
        self.arena.intern(FootstepNode::new(x, y, theta, foot))
    }

    pub fn actions(&self, foot: Foot) -> &[FootstepAction] {
        match foot {
            Foot::Left => &self.left_actions,
            Foot::Right => &self.right_actions,
        }
    }

    /// Interned footstep reached by applying `action` at `current`.
    pub fn execute_footstep(
        &mut self,
        current: NodeId,
        action: &FootstepAction,
    ) -> Result<NodeId, PlanningError> {
        let next = self.arena.node(current)?.execute(action);
        Ok(self.arena.intern(next))
    }

    pub fn is_colliding(&self, footstep: &FootstepNode) -> bool {
        self.map
            .distance_to_nearest_obstacle(footstep.x, footstep.y, footstep.theta)
            < COLLISION_DISTANCE
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn arena(&self) -> &NodeArena<FootstepNode> {
        &self.arena
    }
}

impl<M: ObstacleDistance, H: Heuristic<FootstepNode>> Domain for FootstepDomain<M, H> {
    type Node = FootstepNode;

    fn node(&self, id: NodeId) -> Result<&FootstepNode, PlanningError> {
        self.arena.node(id)
    }

    fn neighbor_nodes(&mut self, current: NodeId) -> Result<Vec<NodeId>, PlanningError> {
        let current = *self.arena.node(current)?;
        let successors: Vec<FootstepNode> = self
            .actions(current.foot.opposite())
            .iter()
            .map(|action| current.execute(action))
            .filter(|next| !self.is_colliding(next))
            .collect();
        Ok(successors
            .into_iter()
            .map(|next| self.arena.intern(next))
            .collect())
    }

    fn costs(&self, current: NodeId, successor: NodeId) -> Result<f64, PlanningError> {
        let (a, b) = (self.arena.node(current)?, self.arena.node(successor)?);
        if a.foot == b.foot {
            return Ok(f64::INFINITY);
        }
        Ok(a.planar_distance(b))
    }

    fn heuristic(&self, current: NodeId, goal: NodeId) -> Result<f64, PlanningError> {
        let (a, b) = (self.arena.node(current)?, self.arena.node(goal)?);
        Ok(self.heuristic.heuristic(a, b))
    }

    fn is_close_to_goal(&self, current: NodeId, goal: NodeId) -> Result<bool, PlanningError> {
        let (a, b) = (self.arena.node(current)?, self.arena.node(goal)?);
        Ok(a.planar_distance(b) < GOAL_DISTANCE
            && shortest_angular_distance(a.theta, b.theta).abs() < GOAL_ANGLE)
    }
}

impl<M, H: Inflatable> Inflatable for FootstepDomain<M, H> {
    fn w(&self) -> f64 {
        self.heuristic.w()
    }

    fn set_w(&mut self, w: f64) -> Result<(), PlanningError> {
        self.heuristic.set_w(w)
    }
}
