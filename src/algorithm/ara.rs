use super::astar::PathPlanning;
use crate::common::{NodeId, Path};
use crate::domain::{Domain, Inflatable};
use crate::error::PlanningError;
use crate::stat::Stats;

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Outcome of one weighted search of an ARA* run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AraIteration {
    pub w: f64,
    pub path_length: usize,
    pub path_costs: f64,
    pub expanded_nodes: usize,
    pub elapsed_secs: f64,
}

/// Anytime repairing A*: repeated weighted A* searches with a shrinking
/// inflation factor, bounded by a wall-clock budget.
#[derive(Debug)]
pub struct AraStar<D> {
    planning: PathPlanning<D>,
    history: Vec<AraIteration>,
}

impl<D: Domain + Inflatable> AraStar<D> {
    pub fn new(domain: D) -> Self {
        AraStar {
            planning: PathPlanning::new(domain),
            history: Vec::new(),
        }
    }

    pub fn domain(&self) -> &D {
        self.planning.domain()
    }

    pub fn domain_mut(&mut self) -> &mut D {
        self.planning.domain_mut()
    }

    /// Statistics of the last weighted search.
    pub fn stats(&self) -> &Stats {
        self.planning.stats()
    }

    /// One entry per weighted search of the last run, in order.
    pub fn history(&self) -> &[AraIteration] {
        &self.history
    }

    /// Inflation factors used by the last run, in order.
    pub fn w_history(&self) -> Vec<f64> {
        self.history.iter().map(|iteration| iteration.w).collect()
    }

    /// Searches with `w = w_initial, w_initial - w_delta, ...` down to 1 and
    /// returns the path of the last search that found one.
    ///
    /// No new search starts once `time_limit` has elapsed, and a running
    /// search is aborted when it elapses. `Duration::MAX` means no limit.
    #[instrument(skip_all, name = "run_ara", fields(w_initial = w_initial, w_delta = w_delta), level = "debug")]
    pub fn run_ara(
        &mut self,
        w_initial: f64,
        w_delta: f64,
        time_limit: Duration,
        start: NodeId,
        goal: NodeId,
    ) -> Result<Path, PlanningError> {
        if !w_initial.is_finite() || w_initial < 1.0 {
            return Err(PlanningError::InvalidWeight(w_initial));
        }
        if !w_delta.is_finite() || w_delta <= 0.0 {
            return Err(PlanningError::InvalidArgument(format!(
                "weight decrement must be positive, got {w_delta}"
            )));
        }

        let started = Instant::now();
        self.history.clear();
        self.planning.set_deadline(started.checked_add(time_limit));

        let result = self.search_with_decreasing_w(w_initial, w_delta, time_limit, started, start, goal);
        self.planning.set_deadline(None);
        result
    }

    fn search_with_decreasing_w(
        &mut self,
        w_initial: f64,
        w_delta: f64,
        time_limit: Duration,
        started: Instant,
        start: NodeId,
        goal: NodeId,
    ) -> Result<Path, PlanningError> {
        let mut best = Path::new();
        for k in 0usize.. {
            let w = scheduled_w(w_initial, w_delta, k);
            if started.elapsed() >= time_limit {
                debug!("time limit reached before searching with w = {w}");
                break;
            }

            self.planning.domain_mut().set_w(w)?;
            let path = self.planning.plan_path(start, goal)?;
            let stats = self.planning.stats();
            let iteration = AraIteration {
                w,
                path_length: path.len(),
                path_costs: stats.path_costs,
                expanded_nodes: stats.expanded_nodes,
                elapsed_secs: started.elapsed().as_secs_f64(),
            };
            info!(
                "w = {}: path length {} costs {} expanded nodes {}",
                iteration.w, iteration.path_length, iteration.path_costs, iteration.expanded_nodes
            );
            self.history.push(iteration);

            if !path.is_empty() {
                best = path;
            }
            if w <= 1.0 {
                break;
            }
        }
        Ok(best)
    }
}

/// Weight of the `k`-th search. Computed from the iteration count so
/// rounding errors do not add up, and snapped to 1 when within `1e-9` of it.
fn scheduled_w(w_initial: f64, w_delta: f64, k: usize) -> f64 {
    let w = w_initial - k as f64 * w_delta;
    if w - 1.0 < 1e-9 {
        1.0
    } else {
        w
    }
}
