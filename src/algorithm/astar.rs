use crate::common::{ClosedList, NodeId, OpenList, Path, SearchTree};
use crate::domain::Domain;
use crate::error::PlanningError;
use crate::stat::Stats;

use std::time::Instant;
use tracing::{debug, instrument, trace};

/// Best-first search over any [`Domain`].
///
/// Every call to [`PathPlanning::plan_path`] works on fresh open/closed
/// lists and a fresh [`SearchTree`], so the same domain (and its interned
/// nodes) can be searched any number of times.
#[derive(Debug)]
pub struct PathPlanning<D> {
    domain: D,
    deadline: Option<Instant>,
    stats: Stats,
}

impl<D: Domain> PathPlanning<D> {
    pub fn new(domain: D) -> Self {
        PathPlanning {
            domain,
            deadline: None,
            stats: Stats::default(),
        }
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn domain_mut(&mut self) -> &mut D {
        &mut self.domain
    }

    pub fn into_domain(self) -> D {
        self.domain
    }

    /// Statistics of the last `plan_path` call.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Wall-clock instant after which searches give up. `None` = no limit.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn timed_out(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// Searches a path from `start` to the first node that is close to
    /// `goal`. Returns an empty path if none exists or the deadline passes
    /// first.
    #[instrument(skip_all, name = "plan_path", fields(start = format!("{start:?}"), goal = format!("{goal:?}")), level = "debug")]
    pub fn plan_path(&mut self, start: NodeId, goal: NodeId) -> Result<Path, PlanningError> {
        let started = Instant::now();
        self.stats = Stats::default();
        debug!(
            "plan from {} to {}",
            self.domain.node(start)?,
            self.domain.node(goal)?
        );

        let mut open_list = OpenList::new();
        let mut closed_list = ClosedList::new();
        let mut tree = SearchTree::new();

        tree.set_costs(start, 0.0);
        open_list.enqueue(start, 0.0)?;
        self.stats.enqueued_nodes += 1;

        let mut path = Path::new();
        while !open_list.is_empty() {
            if self.timed_out() {
                debug!(
                    "deadline passed after {} expansions",
                    self.stats.expanded_nodes
                );
                break;
            }

            let current = open_list.remove_min()?;
            trace!("expand node: {current:?}");

            if self.domain.is_close_to_goal(current, goal)? {
                path = tree.follow_path(current)?;
                self.stats.path_costs = tree.costs(current);
                break;
            }

            closed_list.add(current);
            self.stats.expanded_nodes += 1;
            self.expand_node(current, goal, &mut open_list, &closed_list, &mut tree)?;
        }

        if path.is_empty() {
            debug!("no path found");
        }
        self.stats.path_length = path.len();
        self.stats.time_us = started.elapsed().as_micros();
        Ok(path)
    }

    /// Relaxes all successors of `current` that are not closed yet.
    ///
    /// A successor that is already open keeps its costs and predecessor
    /// unless the path through `current` is strictly cheaper.
    pub fn expand_node(
        &mut self,
        current: NodeId,
        goal: NodeId,
        open_list: &mut OpenList,
        closed_list: &ClosedList,
        tree: &mut SearchTree,
    ) -> Result<(), PlanningError> {
        let current_costs = tree.costs(current);

        for successor in self.domain.neighbor_nodes(current)? {
            if self.timed_out() {
                return Ok(());
            }
            if closed_list.contains(successor) {
                continue;
            }

            let tentative_g_cost = current_costs + self.domain.costs(current, successor)?;
            let is_open = open_list.contains(successor);
            if is_open && tentative_g_cost >= tree.costs(successor) {
                continue;
            }

            tree.set_predecessor(successor, current)?;
            tree.set_costs(successor, tentative_g_cost);

            let f_open_cost = tentative_g_cost + self.domain.heuristic(successor, goal)?;
            if is_open {
                open_list.update_costs(successor, f_open_cost)?;
            } else {
                open_list.enqueue(successor, f_open_cost)?;
                self.stats.enqueued_nodes += 1;
            }
        }
        Ok(())
    }
}
