//! Common test utilities for the plangraph test suite.
//!
//! Provides a small countdown world: a counter that must reach zero, either
//! one step at a time or with a risky double step.

#![allow(dead_code)]

use plangraph::{
    BoundedValue, Result, StateKey, StateTransitionInfo,
    adapters::InMemoryStateContext,
    ports::{
        ActionScheduler, Heuristic, ScheduledTransition, StateDataContext, Termination,
        TerminationEvaluator,
    },
};

/// Decrement by one, always.
pub const SINGLE: u8 = 1;
/// Decrement by two or by one with equal probability.
pub const DOUBLE: u8 = 2;

/// Counter world with terminal state zero and unit step cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct Countdown;

pub type CountdownContext = InMemoryStateContext<u32>;

impl Countdown {
    /// Outcomes of `action` from `n` as (successor, probability).
    pub fn outcomes(n: u32, action: u8) -> Vec<(u32, f64)> {
        match action {
            SINGLE if n >= 1 => vec![(n - 1, 1.0)],
            DOUBLE if n >= 2 => vec![(n - 1, 0.5), (n - 2, 0.5)],
            _ => Vec::new(),
        }
    }

    /// Optimal expected return from `n`.
    pub fn optimal_value(n: u32) -> f64 {
        let mut values: Vec<f64> = vec![0.0; n as usize + 1];
        for i in 1..=n as usize {
            let single = -1.0 + values[i - 1];
            values[i] = if i >= 2 {
                single.max(-1.0 + 0.5 * values[i - 1] + 0.5 * values[i - 2])
            } else {
                single
            };
        }
        values[n as usize]
    }
}

impl Heuristic<u32> for Countdown {
    fn evaluate(&self, state: &u32) -> Result<BoundedValue> {
        let n = f64::from(*state);
        Ok(BoundedValue::new(-n, -n / 2.0, 0.0))
    }
}

impl TerminationEvaluator<u32> for Countdown {
    fn evaluate(&self, state: &u32) -> Result<Termination> {
        Ok(if *state == 0 {
            Termination::terminal(0.0)
        } else {
            Termination::non_terminal()
        })
    }
}

impl ActionScheduler<CountdownContext> for Countdown {
    type Action = u8;

    fn schedule(
        &self,
        context: &CountdownContext,
        states: &[StateKey],
    ) -> Result<Vec<ScheduledTransition<StateKey, u8>>> {
        let mut batch = Vec::new();
        for &state in states {
            let n = context.state_data(&state)?;
            for action in [SINGLE, DOUBLE] {
                for (successor, probability) in Countdown::outcomes(n, action) {
                    let successor = context.register_state(successor);
                    let transition = StateTransitionInfo::new(probability, -1.0)?;
                    batch.push(ScheduledTransition::new(state, action, successor, transition));
                }
            }
        }
        Ok(batch)
    }
}

/// Compare floats with an absolute tolerance.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
