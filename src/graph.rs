//! Plan graph storage, construction and traversal
//!
//! This module provides the shared data structure every planning phase reads
//! and writes.

pub mod builder;
pub mod horizon;
pub mod storage;

pub use builder::{ActionBuilder, GraphBuilder, StateBuilder};
pub use horizon::{DepthMap, Traversal};
pub use storage::{PlanGraph, TransitionMerge};
