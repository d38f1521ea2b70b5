//! Initial values for newly discovered states.

use rayon::prelude::*;

use crate::{
    Result,
    graph::PlanGraph,
    identifiers::GraphKey,
    ports::{Heuristic, StateDataContext, Termination, TerminationEvaluator},
    types::{BoundedValue, StateInfo},
};

/// Fresh record for a state given its termination verdict.
///
/// Terminal states are complete and worth exactly their terminal reward. The
/// heuristic `estimate` only runs for open states.
///
/// # Errors
///
/// Propagates the error of `estimate`.
pub fn leaf_info<F>(verdict: Termination, estimate: F) -> Result<StateInfo>
where
    F: FnOnce() -> Result<BoundedValue>,
{
    if verdict.is_terminal {
        Ok(StateInfo::new(BoundedValue::point(verdict.terminal_reward)).with_complete(true))
    } else {
        Ok(StateInfo::new(estimate()?))
    }
}

/// Evaluate every state in `states` and insert its record into `graph`.
///
/// All collaborator calls finish before anything is inserted, so a failing
/// heuristic or termination check leaves the graph untouched.
///
/// # Errors
///
/// Propagates collaborator failures and [`crate::Error::DuplicateState`] if a
/// state already has a record.
pub fn evaluate_leaves<C, A, H, T>(
    graph: &PlanGraph<C::Key, A>,
    context: &C,
    heuristic: &H,
    termination: &T,
    states: &[C::Key],
) -> Result<Vec<(C::Key, StateInfo)>>
where
    C: StateDataContext,
    A: GraphKey,
    H: Heuristic<C::Data> + ?Sized,
    T: TerminationEvaluator<C::Data> + ?Sized,
{
    let evaluated = states
        .par_iter()
        .map(|state| {
            let data = context.state_data(state)?;
            let verdict = termination.evaluate(&data)?;
            let info = leaf_info(verdict, || heuristic.evaluate(&data))?;
            Ok((*state, info))
        })
        .collect::<Result<Vec<_>>>()?;

    for (state, info) in &evaluated {
        graph.add_state(*state, *info)?;
    }
    Ok(evaluated)
}
