use crate::common::{NodeArena, NodeId, Path, Planar, SearchTree};
use crate::domain::grid::GridNode;
use crate::error::PlanningError;
use crate::map::GridMap;
use crate::stat::Stats;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, instrument, trace, warn};

/// Probability of sampling the goal of the growing tree instead of a random
/// free cell.
pub const GOAL_BIAS: f64 = 0.1;

const MAX_SAMPLE_ATTEMPTS: usize = 1000;

/// Outcome of one tree extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendResult {
    /// The trees are connected.
    Reached,
    /// The nearest node has no free neighbor outside the tree.
    Trapped,
    /// The tree grew by the contained node.
    Extended(NodeId),
}

/// Link between the two trees: `node` belongs to one tree and `link`, its
/// neighbor, to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub node: NodeId,
    pub link: NodeId,
}

/// Nodes of one RRT, in insertion order, with their tree edges.
#[derive(Debug, Clone)]
pub struct RrtTree {
    root: NodeId,
    nodes: Vec<NodeId>,
    members: HashSet<NodeId>,
    edges: SearchTree,
}

impl RrtTree {
    pub fn new(root: NodeId) -> Self {
        RrtTree {
            root,
            nodes: vec![root],
            members: HashSet::from([root]),
            edges: SearchTree::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds `node` as a child of `parent`.
    pub fn insert(&mut self, node: NodeId, parent: NodeId) -> Result<(), PlanningError> {
        self.edges.set_predecessor(node, parent)?;
        if self.members.insert(node) {
            self.nodes.push(node);
        }
        Ok(())
    }

    /// Branch from the root to `node`.
    pub fn branch(&self, node: NodeId) -> Result<Path, PlanningError> {
        self.edges.follow_path(node)
    }
}

/// Bidirectional rapidly-exploring random trees on an 8-connected grid.
///
/// One tree grows from the start and one from the goal. Each iteration
/// extends one tree towards a random sample and then the other tree towards
/// the newly added node, swapping roles afterwards.
#[derive(Debug)]
pub struct BidirectionalRrt {
    map: GridMap,
    arena: NodeArena<GridNode>,
    rng: StdRng,
    connection: Option<Connection>,
    stats: Stats,
}

impl BidirectionalRrt {
    pub fn new(map: GridMap, seed: u64) -> Self {
        BidirectionalRrt {
            map,
            arena: NodeArena::new(),
            rng: StdRng::seed_from_u64(seed),
            connection: None,
            stats: Stats::default(),
        }
    }

    pub fn node_at(&mut self, x: i32, y: i32) -> NodeId {
        self.arena.intern(GridNode::new(x, y))
    }

    pub fn node(&self, id: NodeId) -> Result<&GridNode, PlanningError> {
        self.arena.node(id)
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn connection(&self) -> Option<Connection> {
        self.connection
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// With probability [`GOAL_BIAS`] returns `tree_goal`, otherwise a
    /// uniformly drawn free cell that is not part of `tree`.
    pub fn random_node(&mut self, tree: &RrtTree, tree_goal: NodeId) -> NodeId {
        if self.map.width == 0 || self.map.height == 0 || self.rng.gen_bool(GOAL_BIAS) {
            return tree_goal;
        }
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let x = self.rng.gen_range(0..self.map.width) as i32;
            let y = self.rng.gen_range(0..self.map.height) as i32;
            if matches!(self.map.is_occupied(x, y), Ok(false)) {
                let node = self.arena.intern(GridNode::new(x, y));
                if !tree.contains(node) {
                    return node;
                }
            }
        }
        trace!("no free cell outside the tree found, sampling the goal");
        tree_goal
    }

    pub fn distance(&self, a: NodeId, b: NodeId) -> Result<f64, PlanningError> {
        Ok(self.arena.node(a)?.planar_distance(self.arena.node(b)?))
    }

    /// Node of `list` nearest to `node`, the first one on ties. `None` for an
    /// empty list.
    pub fn closest_node_in_list(
        &self,
        node: NodeId,
        list: &[NodeId],
    ) -> Result<Option<NodeId>, PlanningError> {
        let mut closest = None;
        let mut closest_distance = f64::INFINITY;
        for &candidate in list {
            let distance = self.distance(node, candidate)?;
            if distance < closest_distance {
                closest = Some(candidate);
                closest_distance = distance;
            }
        }
        Ok(closest)
    }

    /// Free 8-connected neighbors of `current` that are not part of `tree`.
    pub fn neighbors(&mut self, current: NodeId, tree: &RrtTree) -> Result<Vec<NodeId>, PlanningError> {
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
                let neighbor = self.arena.intern(GridNode::new(nx, ny));
                if !tree.contains(neighbor) {
                    neighbors.push(neighbor);
                }
            }
        }
        Ok(neighbors)
    }

    /// Returns the first neighbor that already belongs to `other` and records
    /// the connection to `current`.
    pub fn try_to_connect(
        &mut self,
        current: NodeId,
        neighbors: &[NodeId],
        other: &RrtTree,
    ) -> Option<NodeId> {
        let node = neighbors.iter().copied().find(|&n| other.contains(n))?;
        self.connection = Some(Connection {
            node,
            link: current,
        });
        Some(node)
    }

    /// Adds the neighbor closest to `random` to `tree` as a child of
    /// `current` and returns it.
    pub fn add_nearest_neighbor(
        &self,
        current: NodeId,
        neighbors: &[NodeId],
        random: NodeId,
        tree: &mut RrtTree,
    ) -> Result<Option<NodeId>, PlanningError> {
        let Some(nearest) = self.closest_node_in_list(random, neighbors)? else {
            return Ok(None);
        };
        tree.insert(nearest, current)?;
        Ok(Some(nearest))
    }

    /// Grows `tree` by one cell from its node closest to `random`.
    pub fn extend_closest_node(
        &mut self,
        random: NodeId,
        tree: &mut RrtTree,
        other: &RrtTree,
    ) -> Result<ExtendResult, PlanningError> {
        if self.connection.is_some() {
            return Ok(ExtendResult::Reached);
        }

        let closest = self
            .closest_node_in_list(random, tree.nodes())?
            .ok_or_else(|| PlanningError::InvalidArgument("extending an empty tree".to_string()))?;
        let neighbors = self.neighbors(closest, tree)?;

        if self.try_to_connect(closest, &neighbors, other).is_some() {
            return Ok(ExtendResult::Reached);
        }
        match self.add_nearest_neighbor(closest, &neighbors, random, tree)? {
            Some(node) => Ok(ExtendResult::Extended(node)),
            None => Ok(ExtendResult::Trapped),
        }
    }

    /// Splices the start tree branch and the reversed goal tree branch at
    /// the recorded connection. Empty without a connection.
    pub fn construct_path(&self, start_tree: &RrtTree, goal_tree: &RrtTree) -> Result<Path, PlanningError> {
        let Some(Connection { node, link }) = self.connection else {
            return Ok(Path::new());
        };
        let (start_end, goal_end) = if start_tree.contains(node) {
            (node, link)
        } else {
            (link, node)
        };

        let mut path = start_tree.branch(start_end)?;
        let mut back = goal_tree.branch(goal_end)?;
        back.reverse();
        path.extend(back);
        Ok(path)
    }

    /// Grows both trees until they meet or `max_iterations` iterations have
    /// passed. Returns an empty path in the latter case.
    #[instrument(skip_all, name = "rrt_plan_path", fields(start = format!("{start:?}"), goal = format!("{goal:?}"), max_iterations = max_iterations), level = "debug")]
    pub fn plan_path(
        &mut self,
        start: NodeId,
        goal: NodeId,
        max_iterations: usize,
    ) -> Result<Path, PlanningError> {
        let started = Instant::now();
        self.stats = Stats::default();
        self.connection = None;
        debug!(
            "plan from {} to {}",
            self.arena.node(start)?,
            self.arena.node(goal)?
        );
        if self.map.width == 0 || self.map.height == 0 {
            warn!("empty map, no path");
            self.stats.time_us = started.elapsed().as_micros();
            return Ok(Path::new());
        }
        if start == goal {
            self.stats.path_length = 1;
            return Ok(vec![start]);
        }

        let mut start_tree = RrtTree::new(start);
        let mut goal_tree = RrtTree::new(goal);
        let mut forward = true;

        for iteration in 0..max_iterations {
            let (tree, other, tree_goal) = if forward {
                (&mut start_tree, &mut goal_tree, goal)
            } else {
                (&mut goal_tree, &mut start_tree, start)
            };

            let random = self.random_node(tree, tree_goal);
            let mut result = self.extend_closest_node(random, tree, other)?;
            if let ExtendResult::Extended(new_node) = result {
                // Pull the other tree towards the fresh node.
                result = self.extend_closest_node(new_node, other, tree)?;
            }
            self.stats.expanded_nodes = start_tree.len() + goal_tree.len();

            if result == ExtendResult::Reached {
                debug!("trees connected after {} iterations", iteration + 1);
                break;
            }
            forward = !forward;
        }

        let path = self.construct_path(&start_tree, &goal_tree)?;
        if path.is_empty() {
            warn!("no connection between the trees after {max_iterations} iterations");
        } else {
            self.stats.path_costs = path
                .windows(2)
                .map(|pair| self.distance(pair[0], pair[1]))
                .sum::<Result<f64, _>>()?;
        }
        self.stats.path_length = path.len();
        self.stats.time_us = started.elapsed().as_micros();
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    fn test_rrt() -> BidirectionalRrt {
        let map = GridMap::from_file("map_file/test/test.pbm").unwrap();
        BidirectionalRrt::new(map, 42)
    }

    fn tree_of(rrt: &mut BidirectionalRrt, cells: &[(i32, i32)]) -> RrtTree {
        let ids: Vec<_> = cells.iter().map(|&(x, y)| rrt.node_at(x, y)).collect();
        let mut tree = RrtTree::new(ids[0]);
        for pair in ids.windows(2) {
            tree.insert(pair[1], pair[0]).unwrap();
        }
        tree
    }

    const EXPLORED: [(i32, i32); 12] = [
        (5, 9),
        (5, 8),
        (4, 7),
        (7, 7),
        (6, 6),
        (7, 6),
        (4, 5),
        (5, 5),
        (6, 9),
        (6, 8),
        (6, 7),
        (5, 6),
    ];

    fn cells(rrt: &BidirectionalRrt, ids: &[NodeId]) -> Vec<(i32, i32)> {
        let mut cells: Vec<_> = ids
            .iter()
            .map(|&id| {
                let node = rrt.node(id).unwrap();
                (node.x, node.y)
            })
            .collect();
        cells.sort();
        cells
    }

    #[test]
    fn test_random_node() {
        let mut rrt = test_rrt();
        let tree = tree_of(&mut rrt, &EXPLORED);
        let goal = rrt.node_at(0, 4);
        let (width, height) = (rrt.map().width, rrt.map().height);

        let iterations = 15000;
        let mut counter = vec![0usize; width * height];
        for _ in 0..iterations {
            let node = rrt.random_node(&tree, goal);
            let cell = *rrt.node(node).unwrap();
            assert!(rrt.map().in_bounds(cell.x, cell.y));
            assert!(!rrt.map().is_occupied(cell.x, cell.y).unwrap());
            assert!(!tree.contains(node));
            counter[cell.y as usize * width + cell.x as usize] += 1;
        }

        let fraction = counter[4 * width] as f64 / iterations as f64;
        assert!(fraction > 0.07 && fraction < 0.15, "goal fraction {fraction}");
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let free = !rrt.map().is_occupied(x, y).unwrap();
                let explored = EXPLORED.contains(&(x, y));
                if free && !explored {
                    assert!(counter[y as usize * width + x as usize] > 0, "({x}, {y}) never drawn");
                }
            }
        }
    }

    #[test]
    fn test_distance() {
        let mut rrt = test_rrt();
        let pairs = [((0, 5), (3, 1), 5.0), ((0, 4), (5, 3), 5.099019514), ((7, 4), (5, 3), 2.236067977)];
        for ((ax, ay), (bx, by), expected) in pairs {
            let (a, b) = (rrt.node_at(ax, ay), rrt.node_at(bx, by));
            assert!((rrt.distance(a, b).unwrap() - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_closest_node_in_list() {
        let mut rrt = test_rrt();
        let mut list: Vec<_> = EXPLORED.iter().map(|&(x, y)| rrt.node_at(x, y)).collect();
        list.push(rrt.node_at(7, 6));

        let expect = |rrt: &mut BidirectionalRrt, from: (i32, i32), to: (i32, i32)| {
            let from = rrt.node_at(from.0, from.1);
            let to = rrt.node_at(to.0, to.1);
            assert_eq!(rrt.closest_node_in_list(from, &list).unwrap(), Some(to));
        };
        expect(&mut rrt, (2, 5), (4, 5));
        expect(&mut rrt, (1, 1), (4, 5));
        expect(&mut rrt, (9, 4), (7, 6));

        let node = rrt.node_at(9, 4);
        assert_eq!(rrt.closest_node_in_list(node, &[]).unwrap(), None);
    }

    #[test]
    fn test_neighbors() {
        let mut rrt = test_rrt();
        let tree = tree_of(&mut rrt, &EXPLORED);

        let cases = [
            ((1, 1), vec![(0, 1), (0, 2), (1, 0), (1, 2)]),
            ((0, 9), vec![(1, 8)]),
            ((5, 4), vec![(4, 3), (4, 4), (5, 3), (6, 3)]),
        ];
        for ((x, y), expected) in cases {
            let current = rrt.node_at(x, y);
            let neighbors = rrt.neighbors(current, &tree).unwrap();
            assert_eq!(cells(&rrt, &neighbors), expected);
        }
    }

    #[test]
    fn test_try_to_connect() {
        let mut rrt = test_rrt();
        let current = rrt.node_at(4, 4);
        let connection = rrt.node_at(5, 4);
        let neighbors = [rrt.node_at(4, 3), connection];

        let other = tree_of(&mut rrt, &[(5, 9), (6, 9)]);
        assert_eq!(rrt.try_to_connect(current, &neighbors, &other), None);
        assert_eq!(rrt.connection(), None);

        let other = tree_of(&mut rrt, &[(5, 5), (5, 4)]);
        assert_eq!(rrt.try_to_connect(current, &neighbors, &other), Some(connection));
        assert_eq!(
            rrt.connection(),
            Some(Connection {
                node: connection,
                link: current
            })
        );
    }

    #[test]
    fn test_add_nearest_neighbor() {
        let mut rrt = test_rrt();
        let current = rrt.node_at(4, 4);
        let random = rrt.node_at(7, 1);
        let neighbors: Vec<_> = [(4, 5), (5, 5), (5, 3), (5, 4), (4, 3)]
            .iter()
            .map(|&(x, y)| rrt.node_at(x, y))
            .collect();
        let mut tree = tree_of(&mut rrt, &[(3, 3)]);
        tree.insert(current, tree.root()).unwrap();

        let added = rrt
            .add_nearest_neighbor(current, &neighbors, random, &mut tree)
            .unwrap();

        let expected = rrt.node_at(5, 3);
        assert_eq!(added, Some(expected));
        assert_eq!(tree.len(), 3);
        assert!(tree.contains(tree.root()));
        // The new node hangs below the node it was grown from.
        assert_eq!(tree.branch(expected).unwrap(), vec![tree.root(), current, expected]);
        assert_eq!(
            rrt.add_nearest_neighbor(current, &[], random, &mut tree).unwrap(),
            None
        );
    }

    #[test]
    fn test_extend_closest_node() {
        let mut rrt = test_rrt();
        let mut tree = tree_of(&mut rrt, &EXPLORED);
        let other = RrtTree::new(rrt.node_at(9, 0));

        let random = rrt.node_at(1, 1);
        let result = rrt.extend_closest_node(random, &mut tree, &other).unwrap();
        let n44 = rrt.node_at(4, 4);
        assert_eq!(result, ExtendResult::Extended(n44));
        assert!(tree.contains(n44));
        assert_eq!(rrt.connection(), None);

        let n38 = rrt.node_at(3, 8);
        let other = RrtTree::new(n38);
        let random = rrt.node_at(9, 4);
        let result = rrt.extend_closest_node(random, &mut tree, &other).unwrap();
        let n86 = rrt.node_at(8, 6);
        assert_eq!(result, ExtendResult::Extended(n86));
        assert_eq!(rrt.connection(), None);

        let random = rrt.node_at(1, 7);
        let result = rrt.extend_closest_node(random, &mut tree, &other).unwrap();
        assert_eq!(result, ExtendResult::Reached);
        let n47 = rrt.node_at(4, 7);
        assert_eq!(
            rrt.connection(),
            Some(Connection {
                node: n38,
                link: n47
            })
        );
    }

    #[test]
    fn test_trapped_extension() {
        let map = GridMap::from_ascii(&[" #", "##"]).unwrap();
        let mut rrt = BidirectionalRrt::new(map, 0);
        let corner = rrt.node_at(0, 0);
        let mut tree = RrtTree::new(corner);
        let other = RrtTree::new(rrt.node_at(1, 1));

        let result = rrt.extend_closest_node(corner, &mut tree, &other).unwrap();
        assert_eq!(result, ExtendResult::Trapped);
    }

    #[test]
    fn test_construct_path() {
        let mut rrt = test_rrt();
        let start = rrt.node_at(7, 9);
        let goal = rrt.node_at(0, 4);
        let start_tree = tree_of(&mut rrt, &[(7, 9), (6, 8), (6, 7), (5, 6), (4, 5)]);
        let goal_tree = tree_of(&mut rrt, &[(0, 4), (1, 3), (2, 3), (3, 3), (4, 4)]);
        let expected = cells_in_order(
            &mut rrt,
            &[(7, 9), (6, 8), (6, 7), (5, 6), (4, 5), (4, 4), (3, 3), (2, 3), (1, 3), (0, 4)],
        );

        assert!(rrt.construct_path(&start_tree, &goal_tree).unwrap().is_empty());

        let (n45, n44) = (rrt.node_at(4, 5), rrt.node_at(4, 4));

        // Connection found while growing the goal tree.
        rrt.connection = Some(Connection {
            node: n45,
            link: n44,
        });
        let path = rrt.construct_path(&start_tree, &goal_tree).unwrap();
        assert_eq!(path, expected);
        assert_eq!((path[0], path[path.len() - 1]), (start, goal));

        // Connection found while growing the start tree.
        rrt.connection = Some(Connection {
            node: n44,
            link: n45,
        });
        assert_eq!(rrt.construct_path(&start_tree, &goal_tree).unwrap(), expected);
    }

    fn cells_in_order(rrt: &mut BidirectionalRrt, cells: &[(i32, i32)]) -> Path {
        cells.iter().map(|&(x, y)| rrt.node_at(x, y)).collect()
    }

    #[test]
    fn test_plan_path() {
        init_tracing();
        let mut rrt = test_rrt();
        let start = rrt.node_at(7, 9);
        let goal = rrt.node_at(0, 4);

        let path = rrt.plan_path(start, goal, 10000).unwrap();
        assert!(!path.is_empty());
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        for pair in path.windows(2) {
            let a = *rrt.node(pair[0]).unwrap();
            let b = *rrt.node(pair[1]).unwrap();
            assert!((a.x - b.x).abs() <= 1 && (a.y - b.y).abs() <= 1, "{a} -> {b}");
            assert!(!rrt.map().is_occupied(b.x, b.y).unwrap());
        }
        assert_eq!(rrt.stats().path_length, path.len());

        // One iteration cannot bridge the distance.
        assert!(rrt.plan_path(start, goal, 1).unwrap().is_empty());
        assert_eq!(rrt.connection(), None);
    }

    #[test]
    fn test_unreachable_goal() {
        let map = GridMap::from_ascii(&[" #  ", "##  ", "    "]).unwrap();
        let mut rrt = BidirectionalRrt::new(map, 7);
        let start = rrt.node_at(3, 2);
        let goal = rrt.node_at(0, 0);

        assert!(rrt.plan_path(start, goal, 500).unwrap().is_empty());
    }

    #[test]
    fn test_empty_map() {
        let map = GridMap::new(0, 0, Vec::new()).unwrap();
        let mut rrt = BidirectionalRrt::new(map, 3);
        let start = rrt.node_at(0, 0);
        let goal = rrt.node_at(1, 1);

        let tree = RrtTree::new(start);
        assert_eq!(rrt.random_node(&tree, goal), goal);
        assert!(rrt.plan_path(start, goal, 100).unwrap().is_empty());
        assert_eq!(rrt.stats().path_length, 0);
    }
}
