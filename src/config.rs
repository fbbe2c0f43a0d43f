use crate::domain::footstep::Foot;

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Planner {
    /// A* on the occupancy grid.
    Grid,
    /// A* over footstep placements.
    Footstep,
    /// ARA* on the occupancy grid.
    Ara,
    /// Bidirectional RRT on the occupancy grid.
    Rrt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    #[value(name = "straight_line")]
    StraightLine,
    Manhattan,
}

#[derive(Parser, Debug)]
#[command(
    name = "Rust Planning",
    about = "Grid, footstep, ARA* and RRT path planning implemented in Rust.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, value_enum, help = "Planner to use")]
    pub planner: Option<Planner>,

    #[arg(long, value_enum, help = "Heuristic of the grid planners")]
    pub heuristic: Option<HeuristicKind>,

    #[arg(long, help = "Path to the occupancy map (P1 PBM)")]
    pub map_path: Option<String>,

    #[arg(
        long,
        help = "Directory with map.pbm and the distance_<deg>.pgm files of the footstep planner"
    )]
    pub distance_map_dir: Option<String>,

    #[arg(long, help = "Map resolution in meters per cell")]
    pub resolution: Option<f64>,

    #[arg(long, help = "Scale of the distance map pixel values")]
    pub scale: Option<f64>,

    #[arg(
        long,
        help = "Start as x,y (cells) or x,y,theta (footsteps)",
        use_value_delimiter = true,
        allow_hyphen_values = true
    )]
    pub start: Option<Vec<f64>>,

    #[arg(
        long,
        help = "Goal as x,y (cells) or x,y,theta (footsteps)",
        use_value_delimiter = true,
        allow_hyphen_values = true
    )]
    pub goal: Option<Vec<f64>>,

    #[arg(long, help = "Foot of the start footstep")]
    pub start_foot: Option<Foot>,

    #[arg(long, help = "Foot of the goal footstep")]
    pub goal_foot: Option<Foot>,

    #[arg(long, help = "Initial heuristic inflation factor of ARA*")]
    pub w_initial: Option<f64>,

    #[arg(long, help = "Decrement of the inflation factor per ARA* iteration")]
    pub w_delta: Option<f64>,

    #[arg(long, help = "Time limit of ARA* in seconds")]
    pub time_limit_secs: Option<f64>,

    #[arg(long, help = "Maximum number of RRT iterations")]
    pub rrt_max_iterations: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Path to the output path log")]
    pub output_path: Option<String>,

    #[arg(long, help = "Path to the ARA* iteration history (JSON)")]
    pub history_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub planner: Planner,
    pub heuristic: HeuristicKind,
    pub map_path: String,
    pub distance_map_dir: String,
    pub resolution: f64,
    pub scale: f64,
    pub start: Vec<f64>,
    pub goal: Vec<f64>,
    pub start_foot: Foot,
    pub goal_foot: Foot,
    pub w_initial: f64,
    pub w_delta: f64,
    pub time_limit_secs: f64,
    pub rrt_max_iterations: usize,
    pub seed: u64,
    pub output_path: String,
    pub history_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            planner: Planner::Grid,
            heuristic: HeuristicKind::StraightLine,
            map_path: "map_file/test/test.pbm".to_string(),
            distance_map_dir: "map_file/footstep".to_string(),
            resolution: 0.01,
            scale: 5.0,
            start: vec![7.0, 9.0],
            goal: vec![0.0, 4.0],
            start_foot: Foot::Left,
            goal_foot: Foot::Right,
            w_initial: 5.0,
            w_delta: 0.5,
            time_limit_secs: 60.0,
            rrt_max_iterations: 100_000,
            seed: 0,
            output_path: "result/path.txt".to_string(),
            history_path: None,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Replaces every setting that was given explicitly on the command line.
    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(planner) = cli.planner {
            self.planner = planner;
        }
        if let Some(heuristic) = cli.heuristic {
            self.heuristic = heuristic;
        }
        if let Some(map_path) = &cli.map_path {
            self.map_path = map_path.clone();
        }
        if let Some(dir) = &cli.distance_map_dir {
            self.distance_map_dir = dir.clone();
        }
        if let Some(resolution) = cli.resolution {
            self.resolution = resolution;
        }
        if let Some(scale) = cli.scale {
            self.scale = scale;
        }
        if let Some(start) = &cli.start {
            self.start = start.clone();
        }
        if let Some(goal) = &cli.goal {
            self.goal = goal.clone();
        }
        if let Some(foot) = cli.start_foot {
            self.start_foot = foot;
        }
        if let Some(foot) = cli.goal_foot {
            self.goal_foot = foot;
        }
        if let Some(w_initial) = cli.w_initial {
            self.w_initial = w_initial;
        }
        if let Some(w_delta) = cli.w_delta {
            self.w_delta = w_delta;
        }
        if let Some(time_limit_secs) = cli.time_limit_secs {
            self.time_limit_secs = time_limit_secs;
        }
        if let Some(iterations) = cli.rrt_max_iterations {
            self.rrt_max_iterations = iterations;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = output_path.clone();
        }
        if let Some(history_path) = &cli.history_path {
            self.history_path = Some(history_path.clone());
        }
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self.planner {
            Planner::Grid | Planner::Rrt => {
                self.start_cell()?;
                self.goal_cell()?;
            }
            Planner::Ara => {
                self.start_cell()?;
                self.goal_cell()?;
                if !self.w_initial.is_finite() || self.w_initial < 1.0 {
                    return Err(anyhow!(
                        "Initial inflation factor must be at least 1.0, got {}",
                        self.w_initial
                    ));
                }
                if !self.w_delta.is_finite() || self.w_delta <= 0.0 {
                    return Err(anyhow!(
                        "Inflation factor decrement must be positive, got {}",
                        self.w_delta
                    ));
                }
                if self.time_limit_secs.is_nan() || self.time_limit_secs < 0.0 {
                    return Err(anyhow!(
                        "Time limit must not be negative, got {}",
                        self.time_limit_secs
                    ));
                }
            }
            Planner::Footstep => {
                self.start_pose()?;
                self.goal_pose()?;
                if !(self.resolution.is_finite() && self.resolution > 0.0) {
                    return Err(anyhow!(
                        "Resolution must be positive, got {}",
                        self.resolution
                    ));
                }
                if !(self.scale.is_finite() && self.scale > 0.0) {
                    return Err(anyhow!("Scale must be positive, got {}", self.scale));
                }
            }
        }

        if self.planner == Planner::Rrt && self.rrt_max_iterations == 0 {
            return Err(anyhow!("RRT needs at least one iteration"));
        }
        Ok(())
    }

    pub fn start_cell(&self) -> anyhow::Result<(i32, i32)> {
        to_cell("start", &self.start)
    }

    pub fn goal_cell(&self) -> anyhow::Result<(i32, i32)> {
        to_cell("goal", &self.goal)
    }

    pub fn start_pose(&self) -> anyhow::Result<(f64, f64, f64)> {
        to_pose("start", &self.start)
    }

    pub fn goal_pose(&self) -> anyhow::Result<(f64, f64, f64)> {
        to_pose("goal", &self.goal)
    }
}

fn to_cell(name: &str, values: &[f64]) -> anyhow::Result<(i32, i32)> {
    let [x, y] = values else {
        return Err(anyhow!(
            "{name} of a grid planner must be x,y, got {values:?}"
        ));
    };
    let as_index = |v: f64| {
        if v.fract() != 0.0 || v < i32::MIN as f64 || v > i32::MAX as f64 {
            return Err(anyhow!("{name} coordinate {v} is not a cell index"));
        }
        Ok(v as i32)
    };
    Ok((as_index(*x)?, as_index(*y)?))
}

fn to_pose(name: &str, values: &[f64]) -> anyhow::Result<(f64, f64, f64)> {
    let [x, y, theta] = values else {
        return Err(anyhow!(
            "{name} of the footstep planner must be x,y,theta, got {values:?}"
        ));
    };
    if values.iter().any(|v| !v.is_finite()) {
        return Err(anyhow!("{name} pose {values:?} is not finite"));
    }
    Ok((*x, *y, *theta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("planning_rust").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.start_cell().unwrap(), (7, 9));
        assert_eq!(config.goal_cell().unwrap(), (0, 4));
    }

    #[test]
    fn test_from_yaml_str() {
        let config = Config::from_yaml_str(
            "planner: footstep\nstart: [0.5, 0.5, 0.0]\ngoal: [1.5, 0.5, 1.57]\ngoal_foot: left\nscale: 4.0\n",
        )
        .unwrap();

        assert_eq!(config.planner, Planner::Footstep);
        assert_eq!(config.goal_foot, Foot::Left);
        assert_eq!(config.scale, 4.0);
        // Unset keys keep their defaults.
        assert_eq!(config.resolution, 0.01);
        assert_eq!(config.start_foot, Foot::Left);
        config.validate().unwrap();
        assert_eq!(config.goal_pose().unwrap(), (1.5, 0.5, 1.57));

        let config = Config::from_yaml_str("heuristic: manhattan\nplanner: ara\n").unwrap();
        assert_eq!(config.heuristic, HeuristicKind::Manhattan);
        assert_eq!(config.planner, Planner::Ara);

        assert!(Config::from_yaml_str("planner: dijkstra\n").is_err());
        assert!(Config::from_yaml_str("w_intial: 2.0\n").is_err());
    }

    #[test]
    fn test_override_from_command_line() {
        let config = Config::from_yaml_str("planner: ara\nw_initial: 3.0\nseed: 5\n")
            .unwrap()
            .override_from_command_line(&cli(&[
                "--w-initial",
                "2.0",
                "--start",
                "1,2",
                "--heuristic",
                "straight_line",
                "--start-foot",
                "right",
            ]))
            .unwrap();

        assert_eq!(config.planner, Planner::Ara);
        assert_eq!(config.w_initial, 2.0);
        assert_eq!(config.seed, 5);
        assert_eq!(config.start, vec![1.0, 2.0]);
        assert_eq!(config.heuristic, HeuristicKind::StraightLine);
        assert_eq!(config.start_foot, Foot::Right);
    }

    #[test]
    fn test_validate_rejects_inconsistent_settings() {
        let mut config = Config {
            planner: Planner::Ara,
            w_initial: 0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        config.w_initial = 2.0;
        config.w_delta = 0.0;
        assert!(config.validate().is_err());
        config.w_delta = 0.5;
        config.validate().unwrap();

        config.start = vec![1.5, 2.0];
        assert!(config.validate().is_err());

        let config = Config {
            planner: Planner::Footstep,
            ..Config::default()
        };
        // Grid coordinates are not a footstep pose.
        assert!(config.validate().is_err());

        let config = Config {
            planner: Planner::Rrt,
            rrt_max_iterations: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
