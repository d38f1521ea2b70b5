//! Linking scheduled outcomes into the graph, merging duplicate states.
//!
//! Every scheduled successor is resolved to a representative key:
//!
//! 1. a key already in the graph is its own representative;
//! 2. otherwise an existing graph state with equal data wins;
//! 3. otherwise the lowest batch entry with equal data (or the same key) wins.
//!
//! Only entries that represent themselves under rule 3 become new states.
//! Every other freshly produced key is reported for destruction.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::trace;

use crate::{
    Result,
    graph::{PlanGraph, TransitionMerge},
    identifiers::GraphKey,
    ports::{ScheduledTransition, StateDataContext},
    types::ActionInfo,
};

/// Hash-bucketed index of the states currently in the graph.
///
/// Buckets are keyed by [`StateDataContext::state_hash`], so lookups only
/// compare data against states that could be equal.
#[derive(Debug, Clone)]
pub struct StateIndex<S: GraphKey> {
    buckets: HashMap<u64, Vec<S>>,
    hashes: HashMap<S, u64>,
}

impl<S: GraphKey> Default for StateIndex<S> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            hashes: HashMap::new(),
        }
    }
}

impl<S: GraphKey> StateIndex<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `state` under `hash`. Re-inserting a known state is a no-op.
    pub fn insert(&mut self, state: S, hash: u64) {
        if self.hashes.insert(state, hash).is_none() {
            self.buckets.entry(hash).or_default().push(state);
        }
    }

    /// Drop `state` from the index. Returns whether it was present.
    pub fn remove(&mut self, state: &S) -> bool {
        let Some(hash) = self.hashes.remove(state) else {
            return false;
        };
        let emptied = match self.buckets.get_mut(&hash) {
            Some(bucket) => {
                bucket.retain(|candidate| candidate != state);
                bucket.is_empty()
            }
            None => false,
        };
        if emptied {
            self.buckets.remove(&hash);
        }
        true
    }

    /// States indexed under `hash`.
    pub fn candidates(&self, hash: u64) -> &[S] {
        self.buckets.get(&hash).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, state: &S) -> bool {
        self.hashes.contains_key(state)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Result of linking one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionOutcome<S> {
    /// Representatives that were not in the graph, with their data hash.
    pub new_states: Vec<(S, u64)>,
    /// Freshly produced keys that duplicate another state.
    pub destroyed: Vec<S>,
    /// Transitions inserted as new edges.
    pub linked: usize,
    /// Transitions folded into an existing edge.
    pub merged: usize,
}

impl<S> Default for ExpansionOutcome<S> {
    fn default() -> Self {
        Self {
            new_states: Vec::new(),
            destroyed: Vec::new(),
            linked: 0,
            merged: 0,
        }
    }
}

struct Resolution<S> {
    target: S,
    is_new: bool,
}

/// Link `batch` into `graph`.
///
/// New states are wired but have no [`crate::types::StateInfo`] yet; leaf
/// evaluation must run before the graph is consistent again. Duplicated keys
/// are returned, not destroyed.
///
/// # Errors
///
/// Propagates [`StateDataContext::state_data`] failures for batch or index keys,
/// and returns [`crate::Error::InvalidProbability`] when outcomes of one action
/// that land on the same state sum to more than one.
pub fn expand<C, A>(
    graph: &PlanGraph<C::Key, A>,
    context: &C,
    index: &StateIndex<C::Key>,
    batch: &[ScheduledTransition<C::Key, A>],
) -> Result<ExpansionOutcome<C::Key>>
where
    C: StateDataContext,
    A: GraphKey,
{
    if batch.is_empty() {
        return Ok(ExpansionOutcome::default());
    }

    let loaded = batch
        .par_iter()
        .map(|entry| {
            let data = context.state_data(&entry.successor)?;
            let hash = context.state_hash(&data);
            Ok((data, hash))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut batch_buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    for (position, (_, hash)) in loaded.iter().enumerate() {
        batch_buckets.entry(*hash).or_default().push(position);
    }

    let resolutions = (0..batch.len())
        .into_par_iter()
        .map(|position| resolve(graph, context, index, batch, &loaded, &batch_buckets, position))
        .collect::<Result<Vec<_>>>()?;

    let merges = batch
        .par_iter()
        .zip(resolutions.par_iter())
        .map(|(entry, resolution)| {
            graph.insert_action_if_absent(entry.state, entry.action, ActionInfo::default());
            graph.merge_transition(entry.state, entry.action, resolution.target, entry.transition)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut outcome = ExpansionOutcome::default();
    for merge in merges {
        match merge {
            TransitionMerge::Inserted => outcome.linked += 1,
            TransitionMerge::Merged => outcome.merged += 1,
        }
    }
    for ((entry, resolution), (_, hash)) in batch.iter().zip(&resolutions).zip(&loaded) {
        if resolution.is_new {
            outcome.new_states.push((entry.successor, *hash));
        } else if resolution.target != entry.successor {
            outcome.destroyed.push(entry.successor);
        }
    }
    outcome.new_states.sort_unstable();
    outcome.destroyed.sort_unstable();
    outcome.destroyed.dedup();

    trace!(
        new = outcome.new_states.len(),
        destroyed = outcome.destroyed.len(),
        linked = outcome.linked,
        merged = outcome.merged,
        "expansion linked batch"
    );
    Ok(outcome)
}

fn resolve<C, A>(
    graph: &PlanGraph<C::Key, A>,
    context: &C,
    index: &StateIndex<C::Key>,
    batch: &[ScheduledTransition<C::Key, A>],
    loaded: &[(C::Data, u64)],
    batch_buckets: &HashMap<u64, Vec<usize>>,
    position: usize,
) -> Result<Resolution<C::Key>>
where
    C: StateDataContext,
    A: GraphKey,
{
    let key = batch[position].successor;
    if graph.contains_state(&key) {
        return Ok(Resolution {
            target: key,
            is_new: false,
        });
    }

    let (data, hash) = &loaded[position];
    for candidate in index.candidates(*hash) {
        if *candidate == key || context.states_equal(&context.state_data(candidate)?, data) {
            return Ok(Resolution {
                target: *candidate,
                is_new: false,
            });
        }
    }

    let representative = batch_buckets
        .get(hash)
        .into_iter()
        .flatten()
        .copied()
        .take_while(|&other| other <= position)
        .find(|&other| {
            batch[other].successor == key || context.states_equal(&loaded[other].0, data)
        });
    debug_assert!(
        representative.is_some(),
        "batch entry {position} must at least match itself"
    );
    let representative = representative.unwrap_or(position);

    Ok(Resolution {
        target: batch[representative].successor,
        is_new: representative == position,
    })
}
