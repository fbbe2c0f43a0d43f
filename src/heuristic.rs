use crate::common::Planar;
use crate::domain::footstep::FootstepNode;
use crate::domain::Inflatable;
use crate::error::PlanningError;

/// Estimate of the remaining costs from `current` to `goal`.
pub trait Heuristic<N> {
    fn heuristic(&self, current: &N, goal: &N) -> f64;
}

/// Euclidean distance between the two positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineDistance;

impl<N: Planar> Heuristic<N> for StraightLineDistance {
    fn heuristic(&self, current: &N, goal: &N) -> f64 {
        current.planar_distance(goal)
    }
}

/// `|dx| + |dy|`. Not admissible with diagonal moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManhattanDistance;

impl<N: Planar> Heuristic<N> for ManhattanDistance {
    fn heuristic(&self, current: &N, goal: &N) -> f64 {
        let (x1, y1) = current.position();
        let (x2, y2) = goal.position();
        (x1 - x2).abs() + (y1 - y2).abs()
    }
}

/// Planar distance between two footsteps, orientation and foot ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FootstepDistance;

impl Heuristic<FootstepNode> for FootstepDistance {
    fn heuristic(&self, current: &FootstepNode, goal: &FootstepNode) -> f64 {
        current.planar_distance(goal)
    }
}

/// Base heuristic multiplied by the inflation factor `w`.
///
/// `w = 1` keeps the base heuristic unchanged, larger values make the search
/// greedier and the result at most `w` times worse than optimal if the base
/// heuristic is admissible. `w = 0` turns A* into Dijkstra's algorithm.
#[derive(Debug, Clone, Copy)]
pub struct Inflated<H> {
    base: H,
    w: f64,
}

impl<H> Inflated<H> {
    pub fn new(base: H) -> Self {
        Inflated { base, w: 1.0 }
    }

    pub fn with_w(base: H, w: f64) -> Result<Self, PlanningError> {
        let mut inflated = Self::new(base);
        inflated.set_w(w)?;
        Ok(inflated)
    }

    pub fn base(&self) -> &H {
        &self.base
    }
}

impl<H> Inflatable for Inflated<H> {
    fn w(&self) -> f64 {
        self.w
    }

    fn set_w(&mut self, w: f64) -> Result<(), PlanningError> {
        if !w.is_finite() || w < 0.0 {
            return Err(PlanningError::InvalidWeight(w));
        }
        self.w = w;
        Ok(())
    }
}

impl<N, H: Heuristic<N>> Heuristic<N> for Inflated<H> {
    fn heuristic(&self, current: &N, goal: &N) -> f64 {
        // Keeps h = 0 at w = 0 even for infinite base estimates.
        if self.w == 0.0 {
            return 0.0;
        }
        self.w * self.base.heuristic(current, goal)
    }
}
