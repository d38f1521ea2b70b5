//! Application-level configuration.
//!
//! Planner tuning lives here so the CLI, config files and library callers
//! share one validated representation.

pub mod config;

pub use config::{PlannerConfig, SearchLimits, SelectionConfig, SelectionMode};
