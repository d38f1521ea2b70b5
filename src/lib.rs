//! Plan-graph engine for anytime probabilistic planning
//!
//! This crate provides:
//! - A concurrent plan graph of states, actions and probabilistic transitions
//! - Interval value estimates with Bellman backups and completeness tracking
//! - UCT selection in sequential and breadth-parallel variants
//! - Expansion with duplicate-state merging
//! - A planner driver, world-model ports and a demonstration grid world

pub mod adapters;
pub mod app;
pub mod cli;
pub mod error;
pub mod graph;
pub mod identifiers;
pub mod planner;
pub mod ports;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
pub use graph::PlanGraph;
pub use identifiers::{ActionKey, GraphKey, StateKey};
pub use types::{ActionInfo, BoundedValue, StateInfo, StateTransitionInfo};
