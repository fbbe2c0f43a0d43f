pub mod algorithm;
pub mod common;
pub mod config;
pub mod domain;
pub mod error;
pub mod heuristic;
pub mod map;
pub mod report;
pub mod stat;
