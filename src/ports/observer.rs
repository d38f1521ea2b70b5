//! Observer port - abstraction for watching a search as it runs
//!
//! This port lets callers collect progress, metrics or traces without the
//! planner knowing how they are displayed or stored.

use crate::{
    Result,
    planner::{IterationReport, SearchSummary},
};

/// Observer trait for monitoring a planning search
///
/// # Event Sequence
///
/// 1. `on_search_start(max_iterations)` - Once at the beginning
/// 2. `on_iteration(report)` - After every completed planning iteration
/// 3. `on_search_end(summary)` - Once at the end, with the stop reason
///
/// # Examples
///
/// ```no_run
/// use plangraph::{planner::IterationReport, ports::PlanObserver};
///
/// struct CountingObserver {
///     iterations: usize,
/// }
///
/// impl PlanObserver for CountingObserver {
///     fn on_iteration(&mut self, _report: &IterationReport) -> plangraph::Result<()> {
///         self.iterations += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait PlanObserver: Send {
    /// Called before the first iteration.
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    fn on_search_start(&mut self, _max_iterations: u64) -> Result<()> {
        Ok(())
    }

    /// Called after each iteration has finished all four phases.
    ///
    /// The graph is consistent at this point, so observers may rely on the
    /// report's root value and completeness.
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    fn on_iteration(&mut self, _report: &IterationReport) -> Result<()> {
        Ok(())
    }

    /// Called once the search loop stops.
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    fn on_search_end(&mut self, _summary: &SearchSummary) -> Result<()> {
        Ok(())
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PlanObserver for NoopObserver {}
