//! CLI infrastructure for the plangraph planner
//!
//! This module provides the command-line interface for planning over the
//! demonstration grid world and comparing selection strategies.

pub mod commands;
pub mod config;
pub mod output;
