use crate::common::NodeId;

use std::io;
use thiserror::Error;

/// Errors raised by the planning core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanningError {
    /// The handle was never issued by the arena it is used with.
    #[error("unknown node handle {0:?}")]
    UnknownNode(NodeId),

    #[error("setting node {0:?} as its own predecessor creates an infinite loop")]
    SelfPredecessor(NodeId),

    #[error("the predecessor chain starting at {0:?} contains a cycle")]
    PredecessorCycle(NodeId),

    #[error("{operation}: node {node:?} is not on the open list")]
    NodeNotOpen {
        node: NodeId,
        operation: &'static str,
    },

    #[error("remove_min() is called but the open list is empty")]
    EmptyOpenList,

    #[error("cell ({x}, {y}) is outside the {width}x{height} map")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    #[error("invalid heuristic weight {0}")]
    InvalidWeight(f64),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors raised while loading occupancy maps and distance fields.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("expected magic number {expected}, found {found:?}")]
    BadMagic {
        expected: &'static str,
        found: String,
    },

    #[error("malformed header: {0}")]
    BadHeader(String),

    #[error("map of {width}x{height} cells exceeds the limit of {limit} cells per side")]
    TooLarge {
        width: usize,
        height: usize,
        limit: usize,
    },

    #[error("expected {expected} cells, found {found}")]
    DataLength { expected: usize, found: usize },

    #[error("distance map is {found_width}x{found_height}, occupancy map is {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },

    #[error("distance map has invalid depth {0}, expected 255")]
    BadDepth(usize),
}
