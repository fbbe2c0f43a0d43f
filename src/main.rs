use planning_rust::algorithm::{AraStar, BidirectionalRrt, PathPlanning};
use planning_rust::common::NodeId;
use planning_rust::config::{Cli, Config, HeuristicKind, Planner};
use planning_rust::domain::footstep::FootstepDomain;
use planning_rust::domain::grid::{GridDomain, GridNode};
use planning_rust::domain::Domain;
use planning_rust::heuristic::{
    FootstepDistance, Heuristic, Inflated, ManhattanDistance, StraightLineDistance,
};
use planning_rust::map::{FootstepMap, GridMap};
use planning_rust::report;

use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)
            .with_context(|| format!("cannot read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;
    config.validate()?;

    match (config.planner, config.heuristic) {
        (Planner::Grid, HeuristicKind::StraightLine) => run_grid(&config, StraightLineDistance),
        (Planner::Grid, HeuristicKind::Manhattan) => run_grid(&config, ManhattanDistance),
        (Planner::Ara, HeuristicKind::StraightLine) => run_ara(&config, StraightLineDistance),
        (Planner::Ara, HeuristicKind::Manhattan) => run_ara(&config, ManhattanDistance),
        (Planner::Footstep, _) => run_footstep(&config),
        (Planner::Rrt, _) => run_rrt(&config),
    }
}

fn load_map(config: &Config) -> anyhow::Result<GridMap> {
    GridMap::from_file(&config.map_path)
        .with_context(|| format!("error loading map: {}", config.map_path))
}

fn write_result<D: Domain>(config: &Config, domain: &D, path: &[NodeId]) -> anyhow::Result<()> {
    if path.is_empty() {
        warn!("no path found");
    }
    let nodes = path
        .iter()
        .map(|&id| domain.node(id))
        .collect::<Result<Vec<_>, _>>()?;
    report::write_path(&config.output_path, nodes)
}

fn run_grid<H: Heuristic<GridNode>>(config: &Config, heuristic: H) -> anyhow::Result<()> {
    let (start_x, start_y) = config.start_cell()?;
    let (goal_x, goal_y) = config.goal_cell()?;
    let mut domain = GridDomain::new(load_map(config)?, heuristic);
    let start = domain.node_at(start_x, start_y);
    let goal = domain.node_at(goal_x, goal_y);

    let mut planner = PathPlanning::new(domain);
    let path = planner.plan_path(start, goal)?;
    planner.stats().print();
    write_result(config, planner.domain(), &path)
}

fn run_ara<H: Heuristic<GridNode>>(config: &Config, heuristic: H) -> anyhow::Result<()> {
    let (start_x, start_y) = config.start_cell()?;
    let (goal_x, goal_y) = config.goal_cell()?;
    let mut domain = GridDomain::new(load_map(config)?, Inflated::new(heuristic));
    let start = domain.node_at(start_x, start_y);
    let goal = domain.node_at(goal_x, goal_y);

    // An infinite limit does not fit into a Duration and means no limit.
    let time_limit = Duration::try_from_secs_f64(config.time_limit_secs).unwrap_or(Duration::MAX);
    let mut ara = AraStar::new(domain);
    let path = ara.run_ara(config.w_initial, config.w_delta, time_limit, start, goal)?;
    ara.stats().print();
    if let Some(history_path) = &config.history_path {
        report::write_ara_history(history_path, ara.history())?;
    }
    write_result(config, ara.domain(), &path)
}

fn run_footstep(config: &Config) -> anyhow::Result<()> {
    let (start_x, start_y, start_theta) = config.start_pose()?;
    let (goal_x, goal_y, goal_theta) = config.goal_pose()?;
    let map = FootstepMap::load(&config.distance_map_dir, config.resolution, config.scale)
        .with_context(|| format!("error loading footstep map: {}", config.distance_map_dir))?;

    let mut domain = FootstepDomain::new(map, FootstepDistance);
    let start = domain.node_at(start_x, start_y, start_theta, config.start_foot);
    let goal = domain.node_at(goal_x, goal_y, goal_theta, config.goal_foot);
    if domain.is_colliding(domain.node(start)?) {
        warn!("start footstep {} collides with an obstacle", domain.node(start)?);
    }

    let mut planner = PathPlanning::new(domain);
    let path = planner.plan_path(start, goal)?;
    planner.stats().print();
    write_result(config, planner.domain(), &path)
}

fn run_rrt(config: &Config) -> anyhow::Result<()> {
    let (start_x, start_y) = config.start_cell()?;
    let (goal_x, goal_y) = config.goal_cell()?;
    let mut rrt = BidirectionalRrt::new(load_map(config)?, config.seed);
    let start = rrt.node_at(start_x, start_y);
    let goal = rrt.node_at(goal_x, goal_y);

    let path = rrt.plan_path(start, goal, config.rrt_max_iterations)?;
    rrt.stats().print();
    if path.is_empty() {
        warn!("no path found");
    }
    let nodes = path
        .iter()
        .map(|&id| rrt.node(id))
        .collect::<Result<Vec<_>, _>>()?;
    report::write_path(&config.output_path, nodes)
}
