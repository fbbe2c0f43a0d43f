mod ara;
mod astar;
mod rrt;

pub use ara::{AraIteration, AraStar};
pub use astar::PathPlanning;
pub use rrt::{BidirectionalRrt, Connection, ExtendResult, RrtTree, GOAL_BIAS};
