//! UCT descent from the root to the states worth expanding or re-evaluating.
//!
//! Two strategies share one step function:
//!
//! - **Sequential**: `budget` independent descents, each finishing before the
//!   next begins, so later descents see the visit counts of earlier ones.
//! - **Parallel**: every in-flight descent advances one horizon at a time.
//!   Descents arriving at the same state are joined into one frontier entry
//!   carrying their combined budget, and each entry spends that budget one
//!   unit at a time on that state's actions before the horizon barrier.
//!
//! A descent stops at the first state that is not complete but either has no
//! expanded action or sits deeper than its shortest-path horizon.

use std::collections::{BTreeMap, BTreeSet};

use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use tracing::trace;

use crate::{
    Result,
    app::{SelectionConfig, SelectionMode},
    error::{Error, key_string},
    graph::{DepthMap, PlanGraph},
    identifiers::GraphKey,
    utils::{argmax_random_tie, mix_seed, weighted_sample},
};

/// Tuning of the upper-confidence score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionParams {
    pub utility_weight: f64,
    pub exploration_offset: f64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self::from(&SelectionConfig::default())
    }
}

impl From<&SelectionConfig> for SelectionParams {
    fn from(config: &SelectionConfig) -> Self {
        Self {
            utility_weight: config.utility_weight,
            exploration_offset: config.exploration_offset,
        }
    }
}

/// States reached by the descents of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome<S> {
    /// Final state of every descent, deduplicated and sorted.
    pub selected: Vec<S>,
    /// The subset of `selected` without expanded actions.
    pub unexpanded: Vec<S>,
}

impl<S> SelectionOutcome<S> {
    fn empty() -> Self {
        Self {
            selected: Vec::new(),
            unexpanded: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Upper-confidence score of one action.
///
/// `avg * w + (|state avg| + offset) * sqrt(ln(state visits) / action visits)`.
/// An action that was never visited scores `+inf`.
///
/// # Examples
///
/// ```
/// use plangraph::planner::{SelectionParams, uct_score};
///
/// let params = SelectionParams::default();
/// // First visit of the state: ln(1) = 0, so only the value term remains.
/// assert_eq!(uct_score(10.0, 1, 4.0, 1, &params), 5.0);
/// assert!(uct_score(0.0, 0, 0.0, 3, &params).is_infinite());
/// ```
pub fn uct_score(
    action_average: f64,
    action_visits: u32,
    state_average: f64,
    state_visits: u32,
    params: &SelectionParams,
) -> f64 {
    if action_visits == 0 {
        return f64::INFINITY;
    }
    let exploration_factor = state_average.abs() + params.exploration_offset;
    let visits = f64::from(state_visits.max(1));
    action_average * params.utility_weight
        + exploration_factor * (visits.ln() / f64::from(action_visits)).sqrt()
}

/// Run selection from `depths.root()` with the given strategy.
///
/// `depths` must be the expanded-only depth map of the current graph. `seed`
/// should differ between iterations; every descent or frontier entry derives
/// its own generator from it.
///
/// # Errors
///
/// Returns [`Error::NoSelectableAction`] or [`Error::AllSuccessorsComplete`]
/// when completeness flags disagree, and [`Error::MissingState`] or
/// [`Error::MissingAction`] for dangling edges.
pub fn select<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    depths: &DepthMap<S>,
    mode: SelectionMode,
    budget: u32,
    params: &SelectionParams,
    seed: u64,
) -> Result<SelectionOutcome<S>> {
    match mode {
        SelectionMode::Sequential => select_sequential(graph, depths, budget, params, seed),
        SelectionMode::Parallel => select_parallel(graph, depths, budget, params, seed),
    }
}

/// `budget` complete descents, one after another.
pub fn select_sequential<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    depths: &DepthMap<S>,
    budget: u32,
    params: &SelectionParams,
    seed: u64,
) -> Result<SelectionOutcome<S>> {
    let mut leaves = Leaves::default();

    for descent in 0..budget {
        let mut rng = StdRng::seed_from_u64(mix_seed(seed, u64::from(descent), 0));
        let mut state = depths.root();
        let mut depth = 0;

        loop {
            match step(graph, depths, state, 1, depth, params, &mut rng)? {
                Step::Stopped(leaf) => {
                    leaves.record(leaf);
                    break;
                }
                Step::Advanced(next) => {
                    // A single unit of budget produces exactly one successor.
                    let Some(&(successor, _)) = next.first() else {
                        break;
                    };
                    state = successor;
                    depth += 1;
                }
            }
        }
    }

    Ok(leaves.into_outcome())
}

/// Horizon-synchronized descents sharing budget at joins.
pub fn select_parallel<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    depths: &DepthMap<S>,
    budget: u32,
    params: &SelectionParams,
    seed: u64,
) -> Result<SelectionOutcome<S>> {
    if budget == 0 {
        return Ok(SelectionOutcome::empty());
    }

    let mut leaves = Leaves::default();
    let mut frontier = vec![(depths.root(), budget)];
    let mut depth = 0usize;

    while !frontier.is_empty() {
        trace!(depth, entries = frontier.len(), "selection horizon");

        // Frontier keys are unique, so every worker mutates a disjoint state.
        let steps = frontier
            .par_iter()
            .enumerate()
            .map(|(index, &(state, units))| {
                let mut rng = StdRng::seed_from_u64(mix_seed(seed, depth as u64, index as u64));
                step(graph, depths, state, units, depth, params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut next: BTreeMap<S, u32> = BTreeMap::new();
        for outcome in steps {
            match outcome {
                Step::Stopped(leaf) => leaves.record(leaf),
                Step::Advanced(children) => {
                    for (child, units) in children {
                        *next.entry(child).or_default() += units;
                    }
                }
            }
        }

        frontier = next.into_iter().collect();
        depth += 1;
    }

    Ok(leaves.into_outcome())
}

enum Leaf<S> {
    /// The root was already complete; nothing to select.
    Complete,
    Selected { state: S, expanded: bool },
}

enum Step<S> {
    Stopped(Leaf<S>),
    Advanced(Vec<(S, u32)>),
}

struct Leaves<S: Ord> {
    selected: BTreeSet<S>,
    unexpanded: BTreeSet<S>,
}

impl<S: Ord> Default for Leaves<S> {
    fn default() -> Self {
        Self {
            selected: BTreeSet::new(),
            unexpanded: BTreeSet::new(),
        }
    }
}

impl<S: GraphKey> Leaves<S> {
    fn record(&mut self, leaf: Leaf<S>) {
        if let Leaf::Selected { state, expanded } = leaf {
            self.selected.insert(state);
            if !expanded {
                self.unexpanded.insert(state);
            }
        }
    }

    fn into_outcome(self) -> SelectionOutcome<S> {
        SelectionOutcome {
            selected: self.selected.into_iter().collect(),
            unexpanded: self.unexpanded.into_iter().collect(),
        }
    }
}

/// Spend `units` descents at `state`, or stop there.
fn step<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    depths: &DepthMap<S>,
    state: S,
    units: u32,
    depth: usize,
    params: &SelectionParams,
    rng: &mut StdRng,
) -> Result<Step<S>> {
    let info = graph.state_info(&state).ok_or_else(|| Error::MissingState {
        state: key_string(&state),
    })?;
    if info.complete {
        return Ok(Step::Stopped(Leaf::Complete));
    }

    let expanded = graph.has_actions(&state);
    let within_horizon = depths.depth(&state).is_some_and(|horizon| depth <= horizon);
    if !expanded || !within_horizon {
        return Ok(Step::Stopped(Leaf::Selected { state, expanded }));
    }

    let mut children: BTreeMap<S, u32> = BTreeMap::new();
    for _ in 0..units {
        let info = graph.update_state(&state, |info| {
            info.visit_count = info.visit_count.saturating_add(1);
        })?;
        let action = choose_action(
            graph,
            state,
            info.policy_value.average,
            info.visit_count,
            params,
            rng,
        )?;
        graph.update_action(&state, &action, |info| {
            info.visit_count = info.visit_count.saturating_add(1);
        })?;
        let successor = sample_successor(graph, state, action, rng)?;
        *children.entry(successor).or_default() += 1;
    }

    Ok(Step::Advanced(children.into_iter().collect()))
}

fn choose_action<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    state: S,
    state_average: f64,
    state_visits: u32,
    params: &SelectionParams,
    rng: &mut StdRng,
) -> Result<A> {
    let mut candidates = Vec::new();
    let mut scores = Vec::new();

    for action in graph.actions(&state) {
        let info = graph
            .action_info(&state, &action)
            .ok_or_else(|| Error::MissingAction {
                state: key_string(&state),
                action: key_string(&action),
            })?;
        if info.complete {
            continue;
        }
        candidates.push(action);
        scores.push(uct_score(
            info.action_value.average,
            info.visit_count,
            state_average,
            state_visits,
            params,
        ));
    }

    argmax_random_tie(rng, &scores)
        .map(|index| candidates[index])
        .ok_or_else(|| Error::NoSelectableAction {
            state: key_string(&state),
        })
}

fn sample_successor<S: GraphKey, A: GraphKey>(
    graph: &PlanGraph<S, A>,
    state: S,
    action: A,
    rng: &mut StdRng,
) -> Result<S> {
    let mut open = Vec::new();
    for (result, transition) in graph.transitions(&state, &action) {
        let info = graph.state_info(&result).ok_or_else(|| Error::MissingState {
            state: key_string(&result),
        })?;
        if !info.complete {
            open.push((result, transition.probability));
        }
    }

    weighted_sample(rng, &open).ok_or_else(|| Error::AllSuccessorsComplete {
        state: key_string(&state),
        action: key_string(&action),
    })
}
