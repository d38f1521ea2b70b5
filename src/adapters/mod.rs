//! Adapters implementing domain ports.
//!
//! This module contains concrete implementations of the traits defined in the
//! ports module. Following hexagonal architecture, adapters depend on domain
//! ports, not the other way around.

pub mod grid_world;
pub mod in_memory_context;
pub mod observers;

pub use grid_world::{Cell, Direction, GridState, GridWorld};
pub use in_memory_context::InMemoryStateContext;
pub use observers::{ProgressObserver, RecordingObserver};
