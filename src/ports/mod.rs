//! Ports (trait boundaries) for the world model the planner runs against.
//!
//! The planning engine is generic over these traits. Concrete world models,
//! heuristics and observers live in adapters or in downstream crates.

pub mod evaluation;
pub mod observer;
pub mod scheduler;
pub mod state_context;

pub use evaluation::{ConstantHeuristic, Heuristic, Termination, TerminationEvaluator};
pub use observer::{NoopObserver, PlanObserver};
pub use scheduler::{ActionScheduler, ScheduledTransition};
pub use state_context::StateDataContext;
