//! Action scheduler port - applicable-action enumeration lives behind it.

use crate::{
    Result, identifiers::GraphKey, ports::StateDataContext, types::StateTransitionInfo,
};

/// One outcome of applying an action to a state.
///
/// `successor` is a freshly registered key in the state context. Expansion
/// decides whether it denotes a new state or duplicates one already known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTransition<S, A> {
    pub state: S,
    pub action: A,
    pub successor: S,
    pub transition: StateTransitionInfo,
}

impl<S, A> ScheduledTransition<S, A> {
    pub fn new(state: S, action: A, successor: S, transition: StateTransitionInfo) -> Self {
        Self {
            state,
            action,
            successor,
            transition,
        }
    }
}

/// Port enumerating actions and their outcomes for unexpanded states.
pub trait ActionScheduler<C: StateDataContext>: Send + Sync {
    type Action: GraphKey;

    /// Produce every (state, action, successor) outcome for `states`.
    ///
    /// Successor data must be registered through `context` before returning.
    /// A state with no entries in the result is treated as a dead end.
    ///
    /// # Errors
    ///
    /// Any error aborts the current planning iteration.
    fn schedule(
        &self,
        context: &C,
        states: &[C::Key],
    ) -> Result<Vec<ScheduledTransition<C::Key, Self::Action>>>;
}
