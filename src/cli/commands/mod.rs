//! Subcommands of the `plangraph` binary

pub mod compare;
pub mod plan;
