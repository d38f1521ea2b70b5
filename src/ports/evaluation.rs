//! Heuristic and termination ports used by leaf evaluation.

use crate::{Result, types::BoundedValue};

/// Port producing an initial value estimate for a newly discovered state.
pub trait Heuristic<D>: Send + Sync {
    /// Estimate the cumulative future reward reachable from `state`.
    ///
    /// # Errors
    ///
    /// Any error aborts the current planning iteration.
    fn evaluate(&self, state: &D) -> Result<BoundedValue>;
}

/// Verdict of a [`TerminationEvaluator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Termination {
    pub is_terminal: bool,
    pub terminal_reward: f64,
}

impl Termination {
    pub const fn non_terminal() -> Self {
        Self {
            is_terminal: false,
            terminal_reward: 0.0,
        }
    }

    pub const fn terminal(reward: f64) -> Self {
        Self {
            is_terminal: true,
            terminal_reward: reward,
        }
    }
}

/// Port deciding whether a state ends the episode.
pub trait TerminationEvaluator<D>: Send + Sync {
    /// # Errors
    ///
    /// Any error aborts the current planning iteration.
    fn evaluate(&self, state: &D) -> Result<Termination>;
}

/// Heuristic returning the same value for every state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantHeuristic(pub BoundedValue);

impl<D> Heuristic<D> for ConstantHeuristic {
    fn evaluate(&self, _state: &D) -> Result<BoundedValue> {
        Ok(self.0)
    }
}
