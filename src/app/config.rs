//! Configuration types for planner creation.

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How selection spends its per-iteration descent budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum SelectionMode {
    /// Each descent runs from the root to its leaf before the next starts.
    #[default]
    Sequential,
    /// All descents advance one depth level at a time, sharing budget at joins.
    Parallel,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SelectionMode::Sequential => "sequential",
            SelectionMode::Parallel => "parallel",
        };
        f.write_str(label)
    }
}

impl FromStr for SelectionMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(SelectionMode::Sequential),
            "parallel" | "par" => Ok(SelectionMode::Parallel),
            _ => Err(Error::InvalidConfiguration {
                message: format!("unknown selection mode '{s}' (expected sequential, parallel)"),
            }),
        }
    }
}

/// Selection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub mode: SelectionMode,
    /// Number of descents from the root per iteration.
    pub budget: u32,
    /// Weight applied to the average action value in the UCT score.
    pub utility_weight: f64,
    /// Added to `|state value|` to form the exploration factor.
    pub exploration_offset: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::default(),
            budget: 1,
            utility_weight: 0.5,
            exploration_offset: 1.0,
        }
    }
}

/// Stopping rules for [`crate::planner::Planner::search`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub max_iterations: u64,
    /// Stop expanding once the plan holds this many states.
    pub max_states: Option<usize>,
    /// Stop as soon as the root is complete.
    pub stop_when_complete: bool,
    /// Stop once the root's `upper - lower` falls to this width.
    pub root_range_tolerance: Option<f64>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_states: None,
            stop_when_complete: true,
            root_range_tolerance: None,
        }
    }
}

/// Configuration for creating a planner.
///
/// # Examples
///
/// ```
/// use plangraph::app::{PlannerConfig, SelectionMode};
///
/// let config = PlannerConfig::default()
///     .with_discount_factor(0.95)
///     .with_selection_mode(SelectionMode::Parallel)
///     .with_selection_budget(16)
///     .with_max_iterations(200)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Discount applied to successor values during backpropagation.
    pub discount_factor: f64,
    /// Absolute policy-value change below which backpropagation stops climbing.
    pub value_tolerance: f64,
    pub selection: SelectionConfig,
    pub limits: SearchLimits,
    /// Random seed for reproducibility (None = seeded from the OS).
    pub seed: Option<u64>,
    /// Size of a dedicated worker pool (None = rayon's global pool).
    pub threads: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            discount_factor: 1.0,
            value_tolerance: 1e-5,
            selection: SelectionConfig::default(),
            limits: SearchLimits::default(),
            seed: None,
            threads: None,
        }
    }
}

impl PlannerConfig {
    pub fn with_discount_factor(mut self, discount: f64) -> Self {
        self.discount_factor = discount;
        self
    }

    pub fn with_value_tolerance(mut self, tolerance: f64) -> Self {
        self.value_tolerance = tolerance;
        self
    }

    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection.mode = mode;
        self
    }

    pub fn with_selection_budget(mut self, budget: u32) -> Self {
        self.selection.budget = budget;
        self
    }

    pub fn with_utility_weight(mut self, weight: f64) -> Self {
        self.selection.utility_weight = weight;
        self
    }

    pub fn with_exploration_offset(mut self, offset: f64) -> Self {
        self.selection.exploration_offset = offset;
        self
    }

    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.limits.max_iterations = iterations;
        self
    }

    pub fn with_max_states(mut self, states: usize) -> Self {
        self.limits.max_states = Some(states);
        self
    }

    pub fn with_stop_when_complete(mut self, stop: bool) -> Self {
        self.limits.stop_when_complete = stop;
        self
    }

    pub fn with_root_range_tolerance(mut self, tolerance: f64) -> Self {
        self.limits.root_range_tolerance = Some(tolerance);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::InvalidConfiguration { message });

        if !(self.discount_factor > 0.0 && self.discount_factor <= 1.0) {
            return invalid(format!(
                "discount_factor must lie in (0, 1], got {}",
                self.discount_factor
            ));
        }
        if !self.value_tolerance.is_finite() || self.value_tolerance < 0.0 {
            return invalid(format!(
                "value_tolerance must be finite and non-negative, got {}",
                self.value_tolerance
            ));
        }
        if self.selection.budget == 0 {
            return invalid("selection.budget must be at least 1".to_string());
        }
        if !self.selection.utility_weight.is_finite() {
            return invalid("selection.utility_weight must be finite".to_string());
        }
        if !self.selection.exploration_offset.is_finite() || self.selection.exploration_offset < 0.0
        {
            return invalid(format!(
                "selection.exploration_offset must be finite and non-negative, got {}",
                self.selection.exploration_offset
            ));
        }
        if self.limits.max_states == Some(0) {
            return invalid("limits.max_states must be at least 1".to_string());
        }
        if let Some(tolerance) = self.limits.root_range_tolerance
            && (!tolerance.is_finite() || tolerance < 0.0)
        {
            return invalid(format!(
                "limits.root_range_tolerance must be finite and non-negative, got {tolerance}"
            ));
        }
        if self.threads == Some(0) {
            return invalid("threads must be at least 1".to_string());
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Serialization`]
    /// for malformed JSON and [`Error::InvalidConfiguration`] for bad values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            operation: format!("read planner config {}", path.display()),
            source,
        })?;
        let config: PlannerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tuning() {
        let config = PlannerConfig::default();
        assert_eq!(config.discount_factor, 1.0);
        assert_eq!(config.value_tolerance, 1e-5);
        assert_eq!(config.selection.utility_weight, 0.5);
        assert_eq!(config.selection.exploration_offset, 1.0);
        assert_eq!(config.selection.budget, 1);
        assert!(config.limits.stop_when_complete);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        assert!(PlannerConfig::default().with_discount_factor(0.0).validate().is_err());
        assert!(PlannerConfig::default().with_discount_factor(1.1).validate().is_err());
        assert!(PlannerConfig::default().with_value_tolerance(-1.0).validate().is_err());
        assert!(PlannerConfig::default().with_selection_budget(0).validate().is_err());
        assert!(PlannerConfig::default().with_max_states(0).validate().is_err());
        assert!(PlannerConfig::default().with_threads(0).validate().is_err());
        assert!(
            PlannerConfig::default()
                .with_root_range_tolerance(f64::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: PlannerConfig = serde_json::from_str(
            r#"{ "discount_factor": 0.9, "selection": { "mode": "parallel", "budget": 8 } }"#,
        )
        .unwrap();
        assert_eq!(config.discount_factor, 0.9);
        assert_eq!(config.selection.mode, SelectionMode::Parallel);
        assert_eq!(config.selection.budget, 8);
        assert_eq!(config.selection.utility_weight, 0.5);
        assert_eq!(config.limits.max_iterations, 1000);
    }

    #[test]
    fn selection_mode_parses_aliases() {
        assert_eq!("PAR".parse::<SelectionMode>().unwrap(), SelectionMode::Parallel);
        assert_eq!(
            " sequential ".parse::<SelectionMode>().unwrap(),
            SelectionMode::Sequential
        );
        assert!("random".parse::<SelectionMode>().is_err());
    }
}
