//! Observers for planning searches
//!
//! Observers collect progress data while a search runs without coupling the
//! planner to a particular output format.

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Result,
    planner::{IterationReport, SearchSummary},
    ports::PlanObserver,
};

/// Progress bar observer - Shows iteration progress and the root value
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
}

impl ProgressObserver {
    /// Create a new progress observer
    pub fn new() -> Self {
        Self { progress_bar: None }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanObserver for ProgressObserver {
    fn on_search_start(&mut self, max_iterations: u64) -> Result<()> {
        let pb = ProgressBar::new(max_iterations);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} iterations ({msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_position(report.iteration);
            pb.set_message(format!(
                "root {:.3}, {} states",
                report.root_value.average, report.plan_size
            ));
        }
        Ok(())
    }

    fn on_search_end(&mut self, summary: &SearchSummary) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!("{}", summary.stop_reason));
        }
        Ok(())
    }
}

/// Recording observer - Keeps every iteration report
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    reports: Vec<IterationReport>,
    summary: Option<SearchSummary>,
    starts: usize,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[IterationReport] {
        &self.reports
    }

    pub fn summary(&self) -> Option<&SearchSummary> {
        self.summary.as_ref()
    }

    /// How many searches have started while this observer was attached.
    pub fn searches_started(&self) -> usize {
        self.starts
    }

    /// Root value average after each iteration.
    pub fn root_trajectory(&self) -> Vec<f64> {
        self.reports
            .iter()
            .map(|report| report.root_value.average)
            .collect()
    }
}

impl PlanObserver for RecordingObserver {
    fn on_search_start(&mut self, _max_iterations: u64) -> Result<()> {
        self.starts += 1;
        Ok(())
    }

    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        self.reports.push(*report);
        Ok(())
    }

    fn on_search_end(&mut self, summary: &SearchSummary) -> Result<()> {
        self.summary = Some(*summary);
        Ok(())
    }
}
