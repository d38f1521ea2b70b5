//! Plan graph construction, removal and route queries

use plangraph::{
    ActionInfo, BoundedValue, Error, PlanGraph, StateInfo,
    graph::{DepthMap, GraphBuilder},
};

fn diamond() -> PlanGraph<u32, char> {
    // 0 -a-> {1: 0.7, 2: 0.3}, 0 -b-> 3, 1 -a-> 4, 2 -a-> 4
    let graph = PlanGraph::new();
    let builder = GraphBuilder::new(&graph);
    let root = builder.add_state(0).unwrap();
    root.add_action('a')
        .unwrap()
        .add_result(1, 0.7, 0.0)
        .unwrap()
        .add_result(2, 0.3, 0.0)
        .unwrap();
    root.add_action('b').unwrap().add_result(3, 1.0, 0.0).unwrap();
    for state in [1, 2] {
        builder
            .with_state(state)
            .unwrap()
            .add_action('a')
            .unwrap()
            .add_result(4, 1.0, 1.0)
            .unwrap();
    }
    graph
}

#[test]
fn diamond_is_consistent() {
    let graph = diamond();
    graph.check_consistency().unwrap();
    assert_eq!(graph.state_count(), 5);
    assert_eq!(graph.action_count(), 4);
    assert_eq!(graph.transition_count(), 5);

    let mut preds = graph.predecessors(&4);
    preds.sort_unstable();
    assert_eq!(preds, vec![1, 2]);
}

#[test]
fn duplicates_are_rejected_without_side_effects() {
    let graph = diamond();
    let builder = GraphBuilder::new(&graph);

    let err = builder.add_state(1).unwrap_err();
    assert!(matches!(err, Error::DuplicateState { .. }));
    assert!(err.is_consistency_violation());

    let err = builder.with_state(0).unwrap().add_action('a').unwrap_err();
    assert!(matches!(err, Error::DuplicateAction { .. }));

    let err = builder
        .with_state(0)
        .unwrap()
        .with_action('a')
        .unwrap()
        .add_result(1, 0.1, 0.0)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateTransition { .. }));

    assert_eq!(graph.transition_info(&0, &'a', &1).unwrap().probability, 0.7);
    assert_eq!(graph.transition_count(), 5);
}

#[test]
fn missing_records_are_reported() {
    let graph = diamond();
    let builder = GraphBuilder::new(&graph);
    assert!(matches!(
        builder.with_state(42).unwrap_err(),
        Error::MissingState { .. }
    ));
    assert!(matches!(
        builder.with_state(3).unwrap().with_action('z').unwrap_err(),
        Error::MissingAction { .. }
    ));
    assert!(matches!(
        graph.update_action(&3, &'z', |info| info.complete = true),
        Err(Error::MissingAction { .. })
    ));
}

#[test]
fn invalid_probability_is_rejected() {
    let graph: PlanGraph<u32, char> = PlanGraph::new();
    let builder = GraphBuilder::new(&graph);
    let action = builder.add_state(0).unwrap().add_action('a').unwrap();
    assert!(matches!(
        action.add_result(1, 0.0, 0.0).unwrap_err(),
        Error::InvalidProbability { .. }
    ));
    assert!(matches!(
        action.add_result(1, 1.5, 0.0).unwrap_err(),
        Error::InvalidProbability { .. }
    ));
}

#[test]
fn removing_a_region_keeps_the_rest_consistent() {
    let graph = diamond();
    for state in [0, 3] {
        graph.remove_state(&state).unwrap();
    }

    graph.check_consistency().unwrap();
    assert_eq!(graph.state_count(), 3);
    assert!(graph.actions(&0).is_empty());
    assert!(graph.predecessors(&1).is_empty());
    assert_eq!(graph.predecessors(&4).len(), 2);
    assert!(matches!(
        graph.remove_state(&0),
        Err(Error::MissingState { .. })
    ));
}

#[test]
fn depth_map_uses_shortest_distance() {
    let graph = diamond();
    let depths = DepthMap::reachable(&graph, 0);
    assert_eq!(depths.depth(&0), Some(0));
    assert_eq!(depths.depth(&3), Some(1));
    assert_eq!(depths.depth(&4), Some(2));
    assert_eq!(depths.max_depth(), 2);
    assert_eq!(depths.histogram(), vec![1, 3, 1]);

    let expanded = DepthMap::expanded(&graph, 0);
    assert!(expanded.contains(&1));
    assert!(!expanded.contains(&3));
    assert!(!expanded.contains(&4));
}

#[test]
fn optimal_plan_follows_best_action_and_likeliest_outcome() {
    let graph = diamond();
    graph
        .update_action(&0, &'a', |info| {
            *info = ActionInfo::new(BoundedValue::point(2.0))
        })
        .unwrap();
    graph
        .update_action(&0, &'b', |info| {
            *info = ActionInfo::new(BoundedValue::point(1.0))
        })
        .unwrap();
    graph
        .update_state(&4, |info| {
            *info = StateInfo::new(BoundedValue::point(5.0)).with_complete(true)
        })
        .unwrap();

    let plan = graph.optimal_plan(0, 10);
    assert_eq!(plan, vec![(0, 'a'), (1, 'a')]);
    assert_eq!(graph.optimal_plan(0, 1), vec![(0, 'a')]);
}

#[test]
fn optimal_action_breaks_ties_by_key() {
    let graph = diamond();
    assert_eq!(graph.optimal_action(&0).map(|(action, _)| action), Some('a'));
    assert!(graph.optimal_action(&4).is_none());
}
