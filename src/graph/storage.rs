//! Concurrent storage for the plan graph.
//!
//! The graph is bipartite: states own actions, actions own transitions to
//! resulting states. Five concurrent containers hold the structure:
//!
//! - `state_info`: state -> [`StateInfo`]
//! - `action_info`: (state, action) -> [`ActionInfo`]
//! - `transition_info`: (state, action, result) -> [`StateTransitionInfo`]
//! - `action_lookup` / `resulting_states`: the forward edge indices
//! - `predecessors`: result -> direct predecessor states (deduplicated)
//!
//! Records are mutated in place through short-lived shard guards. Callers must
//! never hold a guard into one map while writing to the same map; every public
//! method here copies values out before touching another entry.

use std::collections::HashSet;

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{
    Result,
    error::{Error, key_string},
    identifiers::GraphKey,
    types::{ActionInfo, StateInfo, StateTransitionInfo},
};

/// Result of merging a transition into the graph during expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionMerge {
    /// The (state, action, result) triple was new.
    Inserted,
    /// An existing triple absorbed the additional probability mass.
    Merged,
}

/// Concurrent state/action/transition graph.
#[derive(Debug)]
pub struct PlanGraph<S: GraphKey, A: GraphKey> {
    state_info: DashMap<S, StateInfo>,
    action_info: DashMap<(S, A), ActionInfo>,
    transition_info: DashMap<(S, A, S), StateTransitionInfo>,
    action_lookup: DashMap<S, Vec<A>>,
    resulting_states: DashMap<(S, A), Vec<S>>,
    predecessors: DashMap<S, Vec<S>>,
}

impl<S: GraphKey, A: GraphKey> PlanGraph<S, A> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create an empty graph sized for the given number of states and actions.
    pub fn with_capacity(states: usize, actions: usize) -> Self {
        Self {
            state_info: DashMap::with_capacity(states),
            action_info: DashMap::with_capacity(actions),
            transition_info: DashMap::with_capacity(actions),
            action_lookup: DashMap::with_capacity(states),
            resulting_states: DashMap::with_capacity(actions),
            predecessors: DashMap::with_capacity(states),
        }
    }

    /// Insert a state record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateState`] if the state already exists; the
    /// existing record is left untouched.
    pub fn add_state(&self, state: S, info: StateInfo) -> Result<()> {
        match self.state_info.entry(state) {
            Entry::Occupied(_) => Err(Error::DuplicateState {
                state: key_string(&state),
            }),
            Entry::Vacant(slot) => {
                slot.insert(info);
                Ok(())
            }
        }
    }

    /// Insert an action record for `state` and index it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAction`] if `(state, action)` is already recorded.
    pub fn add_action(&self, state: S, action: A, info: ActionInfo) -> Result<()> {
        if self.insert_action_if_absent(state, action, info) {
            Ok(())
        } else {
            Err(Error::DuplicateAction {
                state: key_string(&state),
                action: key_string(&action),
            })
        }
    }

    /// Insert an action record unless one exists. Returns whether it was inserted.
    ///
    /// Safe to call concurrently for the same pair: exactly one caller wins and
    /// only the winner appends to the action index.
    pub fn insert_action_if_absent(&self, state: S, action: A, info: ActionInfo) -> bool {
        let inserted = match self.action_info.entry((state, action)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(info);
                true
            }
        };
        if inserted {
            self.action_lookup.entry(state).or_default().push(action);
        }
        inserted
    }

    /// Record a transition to `result` and wire the edge indices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTransition`] if the triple is already recorded.
    pub fn add_transition(
        &self,
        state: S,
        action: A,
        result: S,
        info: StateTransitionInfo,
    ) -> Result<()> {
        match self.transition_info.entry((state, action, result)) {
            Entry::Occupied(_) => {
                return Err(Error::DuplicateTransition {
                    state: key_string(&state),
                    action: key_string(&action),
                    result: key_string(&result),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(info);
            }
        }
        self.link_result(state, action, result);
        Ok(())
    }

    /// Record a transition, folding it into an existing identical triple.
    ///
    /// Used when two outcomes of one action turn out to be the same state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProbability`] if the merged probability would
    /// exceed one. The stored transition is left unchanged.
    pub fn merge_transition(
        &self,
        state: S,
        action: A,
        result: S,
        info: StateTransitionInfo,
    ) -> Result<TransitionMerge> {
        let outcome = match self.transition_info.entry((state, action, result)) {
            Entry::Occupied(mut existing) => {
                let merged = existing.get().merged(&info)?;
                existing.insert(merged);
                TransitionMerge::Merged
            }
            Entry::Vacant(slot) => {
                slot.insert(info);
                TransitionMerge::Inserted
            }
        };
        if outcome == TransitionMerge::Inserted {
            self.link_result(state, action, result);
        }
        Ok(outcome)
    }

    fn link_result(&self, state: S, action: A, result: S) {
        self.resulting_states
            .entry((state, action))
            .or_default()
            .push(result);
        let mut preds = self.predecessors.entry(result).or_default();
        if !preds.contains(&state) {
            preds.push(state);
        }
    }

    /// Remove a state together with its actions and outgoing transitions.
    ///
    /// The state is also dropped from the predecessor list of each successor.
    /// Incoming edges are not touched; pruning removes whole unreachable
    /// regions, whose predecessors go with them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingState`] if the state is not in the graph.
    pub fn remove_state(&self, state: &S) -> Result<StateInfo> {
        let (_, info) = self
            .state_info
            .remove(state)
            .ok_or_else(|| Error::MissingState {
                state: key_string(state),
            })?;

        let actions = self
            .action_lookup
            .remove(state)
            .map(|(_, actions)| actions)
            .unwrap_or_default();

        for action in actions {
            self.action_info.remove(&(*state, action));
            let results = self
                .resulting_states
                .remove(&(*state, action))
                .map(|(_, results)| results)
                .unwrap_or_default();

            for result in results {
                self.transition_info.remove(&(*state, action, result));
                if result == *state {
                    continue;
                }
                let now_orphaned = match self.predecessors.get_mut(&result) {
                    Some(mut preds) => {
                        preds.retain(|pred| pred != state);
                        preds.is_empty()
                    }
                    None => false,
                };
                if now_orphaned {
                    self.predecessors.remove(&result);
                }
            }
        }

        self.predecessors.remove(state);
        Ok(info)
    }

    /// Amortized growth hint: make room for at least the requested number of
    /// additional states and actions. Never changes graph contents.
    pub fn expand(&mut self, min_free_states: usize, min_free_actions: usize) {
        grow(&mut self.state_info, min_free_states);
        grow(&mut self.action_lookup, min_free_states);
        grow(&mut self.predecessors, min_free_states);
        grow(&mut self.action_info, min_free_actions);
        grow(&mut self.resulting_states, min_free_actions);
        grow(&mut self.transition_info, min_free_actions);
    }

    pub fn state_info(&self, state: &S) -> Option<StateInfo> {
        self.state_info.get(state).map(|info| *info)
    }

    pub fn action_info(&self, state: &S, action: &A) -> Option<ActionInfo> {
        self.action_info.get(&(*state, *action)).map(|info| *info)
    }

    pub fn transition_info(
        &self,
        state: &S,
        action: &A,
        result: &S,
    ) -> Option<StateTransitionInfo> {
        self.transition_info
            .get(&(*state, *action, *result))
            .map(|info| *info)
    }

    /// Actions recorded for `state`, in insertion order.
    pub fn actions(&self, state: &S) -> Vec<A> {
        self.action_lookup
            .get(state)
            .map(|actions| actions.value().clone())
            .unwrap_or_default()
    }

    /// Whether `state` has at least one expanded action.
    pub fn has_actions(&self, state: &S) -> bool {
        self.action_lookup
            .get(state)
            .is_some_and(|actions| !actions.is_empty())
    }

    /// Successor states of `(state, action)`, in insertion order.
    pub fn resulting_states(&self, state: &S, action: &A) -> Vec<S> {
        self.resulting_states
            .get(&(*state, *action))
            .map(|results| results.value().clone())
            .unwrap_or_default()
    }

    /// Successors of `(state, action)` paired with their transition records.
    pub fn transitions(&self, state: &S, action: &A) -> Vec<(S, StateTransitionInfo)> {
        self.resulting_states(state, action)
            .into_iter()
            .filter_map(|result| {
                self.transition_info(state, action, &result)
                    .map(|info| (result, info))
            })
            .collect()
    }

    /// Direct predecessors of `state`.
    pub fn predecessors(&self, state: &S) -> Vec<S> {
        self.predecessors
            .get(state)
            .map(|preds| preds.value().clone())
            .unwrap_or_default()
    }

    pub fn contains_state(&self, state: &S) -> bool {
        self.state_info.contains_key(state)
    }

    pub fn state_count(&self) -> usize {
        self.state_info.len()
    }

    pub fn action_count(&self) -> usize {
        self.action_info.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transition_info.len()
    }

    /// Snapshot of every state key currently in the graph.
    pub fn state_keys(&self) -> Vec<S> {
        self.state_info.iter().map(|entry| *entry.key()).collect()
    }

    /// Apply `update` to the state's record in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingState`] if the state is not in the graph.
    pub fn update_state<F>(&self, state: &S, update: F) -> Result<StateInfo>
    where
        F: FnOnce(&mut StateInfo),
    {
        let mut info = self
            .state_info
            .get_mut(state)
            .ok_or_else(|| Error::MissingState {
                state: key_string(state),
            })?;
        update(&mut info);
        Ok(*info)
    }

    /// Apply `update` to the action's record in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAction`] if `(state, action)` is not recorded.
    pub fn update_action<F>(&self, state: &S, action: &A, update: F) -> Result<ActionInfo>
    where
        F: FnOnce(&mut ActionInfo),
    {
        let mut info = self
            .action_info
            .get_mut(&(*state, *action))
            .ok_or_else(|| Error::MissingAction {
                state: key_string(state),
                action: key_string(action),
            })?;
        update(&mut info);
        Ok(*info)
    }

    /// Best action of `state` by average action value.
    ///
    /// Ties resolve to the smallest action key so repeated queries agree.
    pub fn optimal_action(&self, state: &S) -> Option<(A, ActionInfo)> {
        let mut best: Option<(A, ActionInfo)> = None;
        for action in self.actions(state) {
            let Some(info) = self.action_info(state, &action) else {
                continue;
            };
            best = match best {
                None => Some((action, info)),
                Some((best_action, best_info)) => {
                    let better = info.action_value.average > best_info.action_value.average
                        || (info.action_value.average == best_info.action_value.average
                            && action < best_action);
                    if better {
                        Some((action, info))
                    } else {
                        Some((best_action, best_info))
                    }
                }
            };
        }
        best
    }

    /// Greedy route from `root`: the optimal action at each state, then that
    /// action's most probable successor.
    ///
    /// Stops at a state without actions, on revisiting a state, or after
    /// `max_len` steps. Equally probable successors resolve to the smaller key.
    pub fn optimal_plan(&self, root: S, max_len: usize) -> Vec<(S, A)> {
        let mut plan = Vec::new();
        let mut visited = HashSet::new();
        let mut state = root;

        while plan.len() < max_len && visited.insert(state) {
            let Some((action, _)) = self.optimal_action(&state) else {
                break;
            };
            plan.push((state, action));

            let next = self
                .transitions(&state, &action)
                .into_iter()
                .max_by(|(a_key, a), (b_key, b)| {
                    a.probability
                        .total_cmp(&b.probability)
                        .then_with(|| b_key.cmp(a_key))
                });
            match next {
                Some((successor, _)) => state = successor,
                None => break,
            }
        }
        plan
    }

    /// Verify that the edge indices and the info maps agree.
    ///
    /// Meant for tests and debug assertions; walks the whole graph.
    ///
    /// # Errors
    ///
    /// Returns the first missing record found.
    pub fn check_consistency(&self) -> Result<()> {
        for entry in self.action_lookup.iter() {
            let state = *entry.key();
            for action in entry.value().iter() {
                if !self.action_info.contains_key(&(state, *action)) {
                    return Err(Error::MissingAction {
                        state: key_string(&state),
                        action: key_string(action),
                    });
                }
            }
        }
        for entry in self.action_info.iter() {
            let (state, action) = *entry.key();
            let indexed = self
                .action_lookup
                .get(&state)
                .is_some_and(|actions| actions.contains(&action));
            if !indexed {
                return Err(Error::MissingAction {
                    state: key_string(&state),
                    action: key_string(&action),
                });
            }
        }
        for entry in self.resulting_states.iter() {
            let (state, action) = *entry.key();
            for result in entry.value().iter() {
                if !self.transition_info.contains_key(&(state, action, *result)) {
                    return Err(Error::MissingTransition {
                        state: key_string(&state),
                        action: key_string(&action),
                        result: key_string(result),
                    });
                }
                if !self.state_info.contains_key(result) {
                    return Err(Error::MissingState {
                        state: key_string(result),
                    });
                }
                let linked = self
                    .predecessors
                    .get(result)
                    .is_some_and(|preds| preds.contains(&state));
                if !linked {
                    return Err(Error::MissingState {
                        state: key_string(&state),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<S: GraphKey, A: GraphKey> Default for PlanGraph<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

fn grow<K, V>(map: &mut DashMap<K, V>, min_free: usize)
where
    K: Eq + std::hash::Hash,
{
    let needed = map.len() + min_free;
    if needed <= map.capacity() {
        return;
    }
    let target = needed.max(map.capacity() * 2);
    let old = std::mem::replace(map, DashMap::with_capacity(target));
    for (key, value) in old {
        map.insert(key, value);
    }
}
