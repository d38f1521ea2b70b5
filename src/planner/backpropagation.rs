//! Bottom-up Bellman backups, one horizon at a time.
//!
//! Work starts from a set of seed states grouped by their shortest-path depth.
//! The deepest horizon is processed first; a state whose policy value moved by
//! more than the tolerance, or whose completeness flipped, schedules its
//! predecessors one horizon up.
//!
//! Predecessors at the same or a deeper horizon (back edges of a cycle) only
//! hear about completeness flips. A state turns complete at most once, so this
//! cannot loop; value changes along back edges are left to later iterations.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use tracing::trace;

use crate::{
    Result,
    error::{Error, key_string},
    graph::{DepthMap, PlanGraph},
    identifiers::GraphKey,
    types::{ActionInfo, BoundedValue},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackpropParams {
    pub discount_factor: f64,
    /// Absolute policy-value change that counts as an update.
    pub value_tolerance: f64,
}

impl Default for BackpropParams {
    fn default() -> Self {
        Self {
            discount_factor: 1.0,
            value_tolerance: 1e-5,
        }
    }
}

/// Work done by one backpropagation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackpropOutcome {
    /// States whose value or completeness changed.
    pub updated: usize,
    /// Horizons that had pending work.
    pub horizons: usize,
}

/// Propagate value changes from `seeds` up to the root of `depths`.
///
/// `depths` must be the reachable depth map of the current graph. Seeds it does
/// not contain are ignored. A seed without actions keeps its record unchanged,
/// including its `complete` flag: an open leaf is an unexpanded frontier state,
/// not a finished one, and only evaluation or dead-end marking completes it. It
/// still notifies its predecessors, which is how fresh leaves and dead ends
/// reach the states above them.
///
/// # Errors
///
/// Returns [`Error::MissingState`] or [`Error::MissingAction`] if an edge
/// points at a record that does not exist.
///
/// # Examples
///
/// ```
/// use plangraph::{
///     BoundedValue, PlanGraph, StateInfo,
///     graph::{DepthMap, GraphBuilder},
///     planner::{BackpropParams, backpropagate},
/// };
///
/// let graph: PlanGraph<u32, u32> = PlanGraph::new();
/// let builder = GraphBuilder::new(&graph);
/// let root = builder.add_state(0)?;
/// root.add_action(0)?.add_new_result(
///     1,
///     StateInfo::new(BoundedValue::point(20.0)).with_complete(true),
///     plangraph::StateTransitionInfo::certain(1.0),
/// )?;
///
/// let depths = DepthMap::reachable(&graph, 0);
/// backpropagate(&graph, &depths, &[0], &BackpropParams::default())?;
///
/// let root = graph.state_info(&0).unwrap();
/// assert_eq!(root.policy_value, BoundedValue::point(21.0));
/// assert!(root.complete);
/// # Ok::<(), plangraph::Error>(())
/// ```
pub fn backpropagate<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    depths: &DepthMap<S>,
    seeds: &[S],
    params: &BackpropParams,
) -> Result<BackpropOutcome> {
    let mut pending: BTreeMap<usize, BTreeSet<S>> = BTreeMap::new();
    for seed in seeds {
        if let Some(depth) = depths.depth(seed) {
            pending.entry(depth).or_default().insert(*seed);
        }
    }
    let seeds: BTreeSet<S> = seeds.iter().copied().collect();

    let mut outcome = BackpropOutcome::default();
    while let Some((depth, horizon)) = pending.pop_last() {
        outcome.horizons += 1;
        let horizon: Vec<S> = horizon.into_iter().collect();

        let changes = horizon
            .par_iter()
            .map(|state| {
                let forced = seeds.contains(state);
                backup_state(graph, state, params, forced).map(|change| (*state, change))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut promoted = 0;
        for (state, change) in changes {
            if !change.changed {
                continue;
            }
            outcome.updated += 1;
            for predecessor in graph.predecessors(&state) {
                let Some(predecessor_depth) = depths.depth(&predecessor) else {
                    continue;
                };
                let upward = predecessor_depth + 1 == depth;
                if upward || (change.completed && predecessor_depth >= depth) {
                    pending
                        .entry(predecessor_depth)
                        .or_default()
                        .insert(predecessor);
                    promoted += 1;
                }
            }
        }
        trace!(depth, states = horizon.len(), promoted, "backpropagated horizon");
    }

    Ok(outcome)
}

struct Change {
    /// Predecessors one horizon up must be recomputed.
    changed: bool,
    /// The state is complete now and was not before (or is a complete seed).
    completed: bool,
}

/// Recompute every action of `state` and then the state itself.
fn backup_state<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    state: &S,
    params: &BackpropParams,
    forced: bool,
) -> Result<Change> {
    let previous = graph.state_info(state).ok_or_else(|| Error::MissingState {
        state: key_string(state),
    })?;

    let actions = graph.actions(state);
    if actions.is_empty() {
        return Ok(Change {
            changed: forced,
            completed: forced && previous.complete,
        });
    }

    let mut best: Option<BoundedValue> = None;
    let mut complete = true;
    for action in actions {
        let info = backup_action(graph, state, &action, params)?;
        best = Some(match best {
            Some(value) => value.component_max(&info.action_value),
            None => info.action_value,
        });
        complete &= info.complete;
    }
    let value = best.unwrap_or(previous.policy_value);

    graph.update_state(state, |info| {
        info.policy_value = value;
        info.complete = complete;
    })?;

    let completed = complete && !previous.complete;
    Ok(Change {
        changed: previous.policy_value.max_abs_diff(&value) > params.value_tolerance
            || previous.complete != complete,
        completed,
    })
}

fn backup_action<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    state: &S,
    action: &A,
    params: &BackpropParams,
) -> Result<ActionInfo> {
    let transitions = graph.transitions(state, action);
    if transitions.is_empty() {
        return graph
            .action_info(state, action)
            .ok_or_else(|| Error::MissingAction {
                state: key_string(state),
                action: key_string(action),
            });
    }

    let mut value = BoundedValue::zero();
    let mut complete = true;
    for (result, transition) in transitions {
        let successor = graph.state_info(&result).ok_or_else(|| Error::MissingState {
            state: key_string(&result),
        })?;
        value += transition.probability
            * (transition.transition_utility + params.discount_factor * successor.policy_value);
        complete &= successor.complete;
    }

    graph.update_action(state, action, |info| {
        info.action_value = value;
        info.complete = complete;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::GraphBuilder, types::StateInfo, types::StateTransitionInfo};

    fn params() -> BackpropParams {
        BackpropParams::default()
    }

    #[test]
    fn stochastic_action_weights_successors() {
        let graph: PlanGraph<u32, u32> = PlanGraph::new();
        let builder = GraphBuilder::new(&graph);
        builder
            .add_state(0)
            .unwrap()
            .add_action(0)
            .unwrap()
            .add_new_result(
                1,
                StateInfo::new(BoundedValue::new(0.0, 10.0, 20.0)),
                StateTransitionInfo::new(0.4, 1.0).unwrap(),
            )
            .unwrap()
            .add_new_result(
                2,
                StateInfo::new(BoundedValue::point(5.0)),
                StateTransitionInfo::new(0.6, -1.0).unwrap(),
            )
            .unwrap();

        backpropagate(&graph, &DepthMap::reachable(&graph, 0), &[1, 2], &params()).unwrap();

        // 0.4 * (1 + [0, 10, 20]) + 0.6 * (-1 + 5)
        let value = graph.action_info(&0, &0).unwrap().action_value;
        assert!(value.approx_eq(&BoundedValue::new(2.8, 6.8, 10.8), 1e-9));
        assert_eq!(graph.state_info(&0).unwrap().policy_value, value);
    }

    #[test]
    fn policy_is_component_wise_max() {
        let graph: PlanGraph<u32, u32> = PlanGraph::new();
        let builder = GraphBuilder::new(&graph);
        let root = builder.add_state(0).unwrap();
        root.add_action(0)
            .unwrap()
            .add_new_result(
                1,
                StateInfo::new(BoundedValue::new(0.0, 5.0, 30.0)),
                StateTransitionInfo::certain(0.0),
            )
            .unwrap();
        root.add_action(1)
            .unwrap()
            .add_new_result(
                2,
                StateInfo::new(BoundedValue::new(4.0, 6.0, 8.0)),
                StateTransitionInfo::certain(0.0),
            )
            .unwrap();

        backpropagate(&graph, &DepthMap::reachable(&graph, 0), &[0], &params()).unwrap();

        assert_eq!(
            graph.state_info(&0).unwrap().policy_value,
            BoundedValue::new(4.0, 6.0, 30.0)
        );
    }

    #[test]
    fn unchanged_values_stop_climbing() {
        // 0 -> 1 -> 2; state 1 already holds the value its child implies.
        let graph: PlanGraph<u32, u32> = PlanGraph::new();
        let builder = GraphBuilder::new(&graph);
        builder
            .add_state_with(0, StateInfo::new(BoundedValue::point(-100.0)))
            .unwrap()
            .add_action(0)
            .unwrap()
            .add_new_result(
                1,
                StateInfo::new(BoundedValue::point(3.0)),
                StateTransitionInfo::certain(0.0),
            )
            .unwrap();
        builder
            .with_state(1)
            .unwrap()
            .add_action(0)
            .unwrap()
            .add_new_result(
                2,
                StateInfo::new(BoundedValue::point(3.0)),
                StateTransitionInfo::certain(0.0),
            )
            .unwrap();

        let outcome =
            backpropagate(&graph, &DepthMap::reachable(&graph, 0), &[1], &params()).unwrap();

        assert_eq!(outcome.updated, 0);
        assert_eq!(
            graph.state_info(&0).unwrap().policy_value,
            BoundedValue::point(-100.0)
        );
    }

    #[test]
    fn zero_action_seed_forces_its_parent() {
        let graph: PlanGraph<u32, u32> = PlanGraph::new();
        let builder = GraphBuilder::new(&graph);
        builder
            .add_state(0)
            .unwrap()
            .add_action(0)
            .unwrap()
            .add_new_result(
                1,
                StateInfo::new(BoundedValue::point(0.0)).with_complete(true),
                StateTransitionInfo::certain(0.0),
            )
            .unwrap();

        let outcome =
            backpropagate(&graph, &DepthMap::reachable(&graph, 0), &[1], &params()).unwrap();

        assert_eq!(outcome.horizons, 2);
        assert!(graph.state_info(&0).unwrap().complete);
        assert!(graph.action_info(&0, &0).unwrap().complete);
    }

    #[test]
    fn open_leaf_seed_stays_open_but_updates_parent() {
        let graph: PlanGraph<u32, u32> = PlanGraph::new();
        let builder = GraphBuilder::new(&graph);
        builder
            .add_state(0)
            .unwrap()
            .add_action(0)
            .unwrap()
            .add_new_result(
                1,
                StateInfo::new(BoundedValue::point(5.0)),
                StateTransitionInfo::certain(0.0),
            )
            .unwrap();

        backpropagate(&graph, &DepthMap::reachable(&graph, 0), &[1], &params()).unwrap();

        let leaf = graph.state_info(&1).unwrap();
        assert!(!leaf.complete);
        assert_eq!(leaf.policy_value, BoundedValue::point(5.0));
        let root = graph.state_info(&0).unwrap();
        assert!(!root.complete);
        assert_eq!(root.policy_value, BoundedValue::point(5.0));
        assert!(!graph.action_info(&0, &0).unwrap().complete);
    }

    #[test]
    fn self_loop_does_not_hang() {
        let graph: PlanGraph<u32, u32> = PlanGraph::new();
        let builder = GraphBuilder::new(&graph);
        let root = builder.add_state(0).unwrap();
        root.add_action(0)
            .unwrap()
            .add_result(0, 0.5, -1.0)
            .unwrap()
            .add_new_result(
                1,
                StateInfo::new(BoundedValue::point(10.0)).with_complete(true),
                StateTransitionInfo::new(0.5, -1.0).unwrap(),
            )
            .unwrap();

        backpropagate(&graph, &DepthMap::reachable(&graph, 0), &[0, 1], &params()).unwrap();

        // 0.5 * (-1 + 0) + 0.5 * (-1 + 10), using the root's value before the pass.
        let root_value = graph.state_info(&0).unwrap().policy_value.average;
        assert!((root_value - 4.0).abs() < 1e-9);
        assert!(!graph.state_info(&0).unwrap().complete);
    }
}
