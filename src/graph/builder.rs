//! Fluent construction API for plan graphs.
//!
//! Every insertion goes through [`PlanGraph`]'s single-insertion checks, so a
//! builder chain can never add an action twice to a state or the same
//! resulting state twice to an action.
//!
//! # Examples
//!
//! ```
//! use plangraph::{BoundedValue, PlanGraph, graph::GraphBuilder};
//!
//! let graph: PlanGraph<u32, u8> = PlanGraph::new();
//! let builder = GraphBuilder::new(&graph);
//!
//! builder
//!     .add_state(0)?
//!     .add_action(1)?
//!     .add_result(1, 0.5, 0.0)?
//!     .add_result(2, 0.5, 1.0)?;
//! builder.with_state(2)?.policy_value(BoundedValue::point(10.0))?.complete(true)?;
//!
//! assert_eq!(graph.state_count(), 3);
//! assert_eq!(graph.resulting_states(&0, &1), vec![1, 2]);
//! # Ok::<(), plangraph::Error>(())
//! ```

use crate::{
    Result,
    error::{Error, key_string},
    graph::PlanGraph,
    identifiers::GraphKey,
    types::{ActionInfo, BoundedValue, StateInfo, StateTransitionInfo},
};

/// Entry point of the fluent API, borrowing the graph it writes to.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'g, S: GraphKey, A: GraphKey> {
    graph: &'g PlanGraph<S, A>,
}

impl<'g, S: GraphKey, A: GraphKey> GraphBuilder<'g, S, A> {
    pub fn new(graph: &'g PlanGraph<S, A>) -> Self {
        Self { graph }
    }

    /// Add a state with a zero value and a single visit.
    pub fn add_state(&self, state: S) -> Result<StateBuilder<'g, S, A>> {
        self.add_state_with(state, StateInfo::new(BoundedValue::zero()))
    }

    /// Add a state with an explicit record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateState`] if the state is already present.
    pub fn add_state_with(&self, state: S, info: StateInfo) -> Result<StateBuilder<'g, S, A>> {
        self.graph.add_state(state, info)?;
        Ok(StateBuilder {
            graph: self.graph,
            state,
        })
    }

    /// Continue building from a state that already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingState`] if the state is not in the graph.
    pub fn with_state(&self, state: S) -> Result<StateBuilder<'g, S, A>> {
        if !self.graph.contains_state(&state) {
            return Err(Error::MissingState {
                state: key_string(&state),
            });
        }
        Ok(StateBuilder {
            graph: self.graph,
            state,
        })
    }
}

/// Builder positioned on one state.
#[derive(Debug, Clone, Copy)]
pub struct StateBuilder<'g, S: GraphKey, A: GraphKey> {
    graph: &'g PlanGraph<S, A>,
    state: S,
}

impl<'g, S: GraphKey, A: GraphKey> StateBuilder<'g, S, A> {
    pub fn key(&self) -> S {
        self.state
    }

    pub fn policy_value(self, value: BoundedValue) -> Result<Self> {
        self.graph
            .update_state(&self.state, |info| info.policy_value = value)?;
        Ok(self)
    }

    pub fn complete(self, complete: bool) -> Result<Self> {
        self.graph
            .update_state(&self.state, |info| info.complete = complete)?;
        Ok(self)
    }

    pub fn visit_count(self, visit_count: u32) -> Result<Self> {
        self.graph
            .update_state(&self.state, |info| info.visit_count = visit_count)?;
        Ok(self)
    }

    /// Add an action with a zero value and a single visit.
    pub fn add_action(&self, action: A) -> Result<ActionBuilder<'g, S, A>> {
        self.add_action_with(action, ActionInfo::default())
    }

    /// Add an action with an explicit record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAction`] if the state already has this action.
    pub fn add_action_with(&self, action: A, info: ActionInfo) -> Result<ActionBuilder<'g, S, A>> {
        self.graph.add_action(self.state, action, info)?;
        Ok(ActionBuilder {
            graph: self.graph,
            state: self.state,
            action,
        })
    }

    /// Continue building from an action that already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAction`] if the action is not recorded.
    pub fn with_action(&self, action: A) -> Result<ActionBuilder<'g, S, A>> {
        if self.graph.action_info(&self.state, &action).is_none() {
            return Err(Error::MissingAction {
                state: key_string(&self.state),
                action: key_string(&action),
            });
        }
        Ok(ActionBuilder {
            graph: self.graph,
            state: self.state,
            action,
        })
    }
}

/// Builder positioned on one (state, action) pair.
#[derive(Debug, Clone, Copy)]
pub struct ActionBuilder<'g, S: GraphKey, A: GraphKey> {
    graph: &'g PlanGraph<S, A>,
    state: S,
    action: A,
}

impl<'g, S: GraphKey, A: GraphKey> ActionBuilder<'g, S, A> {
    pub fn key(&self) -> (S, A) {
        (self.state, self.action)
    }

    /// Add a resulting state reached with `probability` and `utility`.
    ///
    /// The resulting state is created with a zero value if it is not yet in
    /// the graph; an existing state is linked as-is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProbability`] for probabilities outside (0, 1] and
    /// [`Error::DuplicateTransition`] if this result is already linked.
    pub fn add_result(self, result: S, probability: f64, utility: f64) -> Result<Self> {
        let transition = StateTransitionInfo::new(probability, utility)?;
        if !self.graph.contains_state(&result) {
            self.graph
                .add_state(result, StateInfo::new(BoundedValue::zero()))?;
        }
        self.graph
            .add_transition(self.state, self.action, result, transition)?;
        Ok(self)
    }

    /// Add a resulting state that must not exist yet, with an explicit record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateState`] if the result is already in the graph.
    pub fn add_new_result(
        self,
        result: S,
        info: StateInfo,
        transition: StateTransitionInfo,
    ) -> Result<Self> {
        self.graph.add_state(result, info)?;
        self.graph
            .add_transition(self.state, self.action, result, transition)?;
        Ok(self)
    }

    pub fn action_value(self, value: BoundedValue) -> Result<Self> {
        self.graph
            .update_action(&self.state, &self.action, |info| info.action_value = value)?;
        Ok(self)
    }

    pub fn complete(self, complete: bool) -> Result<Self> {
        self.graph
            .update_action(&self.state, &self.action, |info| info.complete = complete)?;
        Ok(self)
    }

    /// Step back to the owning state to add sibling actions.
    pub fn state(&self) -> StateBuilder<'g, S, A> {
        StateBuilder {
            graph: self.graph,
            state: self.state,
        }
    }
}
