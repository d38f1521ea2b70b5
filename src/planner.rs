//! The four planning phases and the driver that sequences them.
//!
//! Each phase is a free function over a [`crate::graph::PlanGraph`] so it can
//! be exercised on hand-built graphs. [`Planner`] owns the graph and the world
//! model collaborators and runs the phases in order, one iteration at a time.

pub mod backpropagation;
pub mod evaluation;
pub mod expansion;
pub mod search;
pub mod selection;

pub use backpropagation::{BackpropOutcome, BackpropParams, backpropagate};
pub use evaluation::{evaluate_leaves, leaf_info};
pub use expansion::{ExpansionOutcome, StateIndex, expand};
pub use search::{IterationReport, Planner, PruneReport, SearchSummary, StopReason};
pub use selection::{
    SelectionOutcome, SelectionParams, select, select_parallel, select_sequential, uct_score,
};
