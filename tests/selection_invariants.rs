//! Selection invariants in both modes

mod common;

use common::{Countdown, CountdownContext};
use plangraph::{
    BoundedValue, Error, PlanGraph, StateInfo,
    app::{PlannerConfig, SelectionMode},
    graph::{DepthMap, GraphBuilder},
    planner::{Planner, SelectionParams, select},
};

type CountdownPlanner = Planner<CountdownContext, Countdown, Countdown, Countdown>;

fn grown_planner(iterations: u64) -> CountdownPlanner {
    let config = PlannerConfig::default()
        .with_seed(3)
        .with_selection_budget(2);
    let mut planner = Planner::new(
        CountdownContext::new(),
        Countdown,
        Countdown,
        Countdown,
        12,
        config,
    )
    .unwrap();
    for _ in 0..iterations {
        planner.run_iteration().unwrap();
    }
    planner
}

#[test]
fn selected_states_are_open_and_unexpanded_ones_have_no_actions() {
    for mode in [SelectionMode::Sequential, SelectionMode::Parallel] {
        let planner = grown_planner(4);
        let graph = planner.graph();
        let depths = DepthMap::expanded(graph, planner.root());

        let outcome = select(graph, &depths, mode, 8, &SelectionParams::default(), 99).unwrap();
        assert!(!outcome.is_empty(), "{mode} selected nothing");
        for state in &outcome.selected {
            let info = graph.state_info(state).unwrap();
            assert!(!info.complete, "{mode} selected a complete state");
        }
        for state in &outcome.unexpanded {
            assert!(outcome.selected.binary_search(state).is_ok());
            assert!(!graph.has_actions(state));
        }
        assert!(outcome.selected.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[test]
fn root_visits_grow_by_the_budget() {
    for mode in [SelectionMode::Sequential, SelectionMode::Parallel] {
        let planner = grown_planner(3);
        let graph = planner.graph();
        let root = planner.root();
        let before = graph.state_info(&root).unwrap().visit_count;

        let depths = DepthMap::expanded(graph, root);
        select(graph, &depths, mode, 5, &SelectionParams::default(), 1).unwrap();

        let after = graph.state_info(&root).unwrap().visit_count;
        assert_eq!(after, before + 5, "{mode}");
        let action_visits: u32 = graph
            .actions(&root)
            .iter()
            .map(|action| graph.action_info(&root, action).unwrap().visit_count)
            .sum();
        // Every action starts with one visit.
        let fresh = graph.actions(&root).len() as u32;
        assert!(action_visits >= fresh + 5);
    }
}

#[test]
fn same_seed_gives_same_selection_on_a_fixed_graph() {
    let build = || {
        let graph: PlanGraph<u32, u32> = PlanGraph::new();
        let builder = GraphBuilder::new(&graph);
        let root = builder
            .add_state_with(0, StateInfo::new(BoundedValue::point(1.0)))
            .unwrap();
        for action in 0..4 {
            root.add_action(action)
                .unwrap()
                .add_result(10 + action, 0.5, 0.0)
                .unwrap()
                .add_result(20 + action, 0.5, 0.0)
                .unwrap();
        }
        graph
    };

    for mode in [SelectionMode::Sequential, SelectionMode::Parallel] {
        let first = build();
        let second = build();
        let params = SelectionParams::default();
        let a = select(&first, &DepthMap::expanded(&first, 0), mode, 6, &params, 42).unwrap();
        let b = select(&second, &DepthMap::expanded(&second, 0), mode, 6, &params, 42).unwrap();
        assert_eq!(a, b, "{mode}");
    }
}

#[test]
fn inconsistent_completeness_is_reported() {
    let graph: PlanGraph<u32, u32> = PlanGraph::new();
    let builder = GraphBuilder::new(&graph);
    builder
        .add_state(0)
        .unwrap()
        .add_action(0)
        .unwrap()
        .add_result(1, 1.0, 0.0)
        .unwrap()
        .complete(true)
        .unwrap();

    let depths = DepthMap::expanded(&graph, 0);
    let err = select(
        &graph,
        &depths,
        SelectionMode::Sequential,
        1,
        &SelectionParams::default(),
        0,
    )
    .unwrap_err();
    assert!(matches!(err, Error::NoSelectableAction { .. }));

    graph.update_action(&0, &0, |info| info.complete = false).unwrap();
    graph.update_state(&1, |info| info.complete = true).unwrap();
    let err = select(
        &graph,
        &depths,
        SelectionMode::Parallel,
        1,
        &SelectionParams::default(),
        0,
    )
    .unwrap_err();
    assert!(matches!(err, Error::AllSuccessorsComplete { .. }));
}
