//! Expansion merges produced states that duplicate known ones

mod common;

use common::{Countdown, CountdownContext, DOUBLE, SINGLE};
use plangraph::{
    BoundedValue, Error, PlanGraph, Result, StateInfo, StateKey, StateTransitionInfo,
    planner::{StateIndex, evaluate_leaves, expand},
    ports::{ActionScheduler, ScheduledTransition, StateDataContext},
};

/// Countdown storage whose hash puts every state in one bucket.
#[derive(Default)]
struct CollidingContext {
    inner: CountdownContext,
}

impl StateDataContext for CollidingContext {
    type Key = StateKey;
    type Data = u32;

    fn create_state(&self) -> u32 {
        self.inner.create_state()
    }

    fn register_state(&self, data: u32) -> StateKey {
        self.inner.register_state(data)
    }

    fn destroy_state(&self, key: &StateKey) -> Result<()> {
        self.inner.destroy_state(key)
    }

    fn states_equal(&self, a: &u32, b: &u32) -> bool {
        a == b
    }

    fn state_hash(&self, _data: &u32) -> u64 {
        7
    }

    fn state_data(&self, key: &StateKey) -> Result<u32> {
        self.inner.state_data(key)
    }
}

struct Fixture {
    graph: PlanGraph<StateKey, u8>,
    context: CountdownContext,
    index: StateIndex<StateKey>,
    root: StateKey,
}

fn fixture(n: u32) -> Fixture {
    let graph = PlanGraph::new();
    let context = CountdownContext::new();
    let mut index = StateIndex::new();
    let root = context.register_state(n);
    graph
        .add_state(root, StateInfo::new(BoundedValue::zero()))
        .unwrap();
    index.insert(root, context.state_hash(&n));
    Fixture {
        graph,
        context,
        index,
        root,
    }
}

fn successor_values(fx: &Fixture, state: StateKey, action: u8) -> Vec<u32> {
    let mut values: Vec<u32> = fx
        .graph
        .resulting_states(&state, &action)
        .iter()
        .map(|key| fx.context.state_data(key).unwrap())
        .collect();
    values.sort_unstable();
    values
}

#[test]
fn duplicate_inside_one_batch_becomes_one_state() {
    let mut fx = fixture(4);
    let batch = Countdown.schedule(&fx.context, &[fx.root]).unwrap();
    // 4 -single-> 3, 4 -double-> {3, 2}
    assert_eq!(batch.len(), 3);
    assert_eq!(fx.context.len(), 4);

    let outcome = expand(&fx.graph, &fx.context, &fx.index, &batch).unwrap();
    assert_eq!(outcome.new_states.len(), 2);
    assert_eq!(outcome.destroyed.len(), 1);
    assert_eq!(outcome.linked, 3);
    assert_eq!(outcome.merged, 0);

    let three_single = fx.graph.resulting_states(&fx.root, &SINGLE);
    assert_eq!(three_single.len(), 1);
    assert!(
        fx.graph
            .resulting_states(&fx.root, &DOUBLE)
            .contains(&three_single[0])
    );
    assert_eq!(successor_values(&fx, fx.root, DOUBLE), vec![2, 3]);
    assert_eq!(fx.graph.predecessors(&three_single[0]), vec![fx.root]);

    for duplicate in &outcome.destroyed {
        fx.context.destroy_state(duplicate).unwrap();
    }
    assert_eq!(fx.context.len(), 3);

    let new_states: Vec<_> = outcome.new_states.iter().map(|(key, _)| *key).collect();
    evaluate_leaves(&fx.graph, &fx.context, &Countdown, &Countdown, &new_states).unwrap();
    fx.graph.check_consistency().unwrap();
    for (state, hash) in outcome.new_states {
        fx.index.insert(state, hash);
    }
    assert_eq!(fx.index.len(), 3);
}

#[test]
fn produced_state_equal_to_a_known_one_is_linked_to_it() {
    let mut fx = fixture(4);
    let batch = Countdown.schedule(&fx.context, &[fx.root]).unwrap();
    let first = expand(&fx.graph, &fx.context, &fx.index, &batch).unwrap();
    for duplicate in &first.destroyed {
        fx.context.destroy_state(duplicate).unwrap();
    }
    let new_states: Vec<_> = first.new_states.iter().map(|(key, _)| *key).collect();
    evaluate_leaves(&fx.graph, &fx.context, &Countdown, &Countdown, &new_states).unwrap();
    for (state, hash) in &first.new_states {
        fx.index.insert(*state, *hash);
    }

    let three = fx.graph.resulting_states(&fx.root, &SINGLE)[0];
    let two = fx
        .graph
        .resulting_states(&fx.root, &DOUBLE)
        .into_iter()
        .find(|key| *key != three)
        .unwrap();

    // 3 -single-> 2 (known), 3 -double-> {2 (known), 1 (new)}
    let batch = Countdown.schedule(&fx.context, &[three]).unwrap();
    let second = expand(&fx.graph, &fx.context, &fx.index, &batch).unwrap();
    assert_eq!(second.new_states.len(), 1);
    assert_eq!(second.destroyed.len(), 2);
    assert_eq!(fx.graph.resulting_states(&three, &SINGLE), vec![two]);
    assert!(fx.graph.resulting_states(&three, &DOUBLE).contains(&two));

    let mut preds = fx.graph.predecessors(&two);
    preds.sort_unstable();
    let mut expected = vec![fx.root, three];
    expected.sort_unstable();
    assert_eq!(preds, expected);
}

#[test]
fn outcomes_landing_on_one_state_merge_their_transitions() {
    let fx = fixture(7);
    let a = fx.context.register_state(5);
    let b = fx.context.register_state(5);
    let batch = vec![
        ScheduledTransition::new(fx.root, SINGLE, a, StateTransitionInfo::new(0.5, -1.0).unwrap()),
        ScheduledTransition::new(fx.root, SINGLE, b, StateTransitionInfo::new(0.5, -3.0).unwrap()),
    ];

    let outcome = expand(&fx.graph, &fx.context, &fx.index, &batch).unwrap();
    assert_eq!(outcome.new_states.len(), 1);
    assert_eq!(outcome.destroyed, vec![b]);
    assert_eq!(outcome.linked, 1);
    assert_eq!(outcome.merged, 1);

    let transition = fx.graph.transition_info(&fx.root, &SINGLE, &a).unwrap();
    assert!((transition.probability - 1.0).abs() < 1e-12);
    assert!((transition.transition_utility + 2.0).abs() < 1e-12);
}

#[test]
fn empty_batch_changes_nothing() {
    let fx = fixture(3);
    let outcome = expand::<_, u8>(&fx.graph, &fx.context, &fx.index, &[]).unwrap();
    assert!(outcome.new_states.is_empty());
    assert_eq!(fx.graph.state_count(), 1);
}

#[test]
fn colliding_hashes_still_compare_state_data() {
    let graph: PlanGraph<StateKey, u8> = PlanGraph::new();
    let context = CollidingContext::default();
    let mut index = StateIndex::new();
    let root = context.register_state(100);
    graph
        .add_state(root, StateInfo::new(BoundedValue::zero()))
        .unwrap();
    index.insert(root, context.state_hash(&100));

    let produced: Vec<StateKey> = [1, 2, 1, 100]
        .into_iter()
        .map(|data| context.register_state(data))
        .collect();
    let batch: Vec<_> = produced
        .iter()
        .zip(0u8..)
        .map(|(successor, action)| {
            ScheduledTransition::new(root, action, *successor, StateTransitionInfo::certain(-1.0))
        })
        .collect();

    let outcome = expand(&graph, &context, &index, &batch).unwrap();

    // Unequal data in the shared bucket stays apart.
    let mut new_keys: Vec<_> = outcome.new_states.iter().map(|(key, _)| *key).collect();
    new_keys.sort_unstable();
    let mut expected_new = vec![produced[0], produced[1]];
    expected_new.sort_unstable();
    assert_eq!(new_keys, expected_new);

    // The repeated 1 folds into the earliest entry, the copy of the root into the root.
    let mut expected_destroyed = vec![produced[2], produced[3]];
    expected_destroyed.sort_unstable();
    assert_eq!(outcome.destroyed, expected_destroyed);
    assert_eq!(graph.resulting_states(&root, &2), vec![produced[0]]);
    assert_eq!(graph.resulting_states(&root, &3), vec![root]);
    assert_eq!(outcome.linked, 4);
    assert_eq!(outcome.merged, 0);
}

#[test]
fn merged_outcomes_above_certainty_are_rejected() {
    let fx = fixture(7);
    let a = fx.context.register_state(5);
    let b = fx.context.register_state(5);
    let likely = StateTransitionInfo::new(0.7, -1.0).unwrap();
    let batch = vec![
        ScheduledTransition::new(fx.root, SINGLE, a, likely),
        ScheduledTransition::new(fx.root, SINGLE, b, likely),
    ];

    let err = expand(&fx.graph, &fx.context, &fx.index, &batch).unwrap_err();
    assert!(matches!(err, Error::InvalidProbability { .. }));
}
