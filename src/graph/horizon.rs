//! Breadth-first depth maps over the plan graph.
//!
//! A [`DepthMap`] records the shortest distance (in edges) from a root to every
//! state it reaches. Backpropagation groups its work by these depths and
//! selection uses them to stop descents that took a longer route.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::{graph::PlanGraph, identifiers::GraphKey};

/// Which successors a traversal is allowed to enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Follow every recorded transition.
    Reachable,
    /// Only enqueue successors that have at least one action themselves.
    ExpandedOnly,
}

/// Shortest-path depth of each state from a root.
#[derive(Debug, Clone)]
pub struct DepthMap<S: GraphKey> {
    root: S,
    depths: HashMap<S, usize>,
    max_depth: usize,
}

impl<S: GraphKey> DepthMap<S> {
    /// Depths of every state reachable from `root`.
    pub fn reachable<A: GraphKey>(graph: &PlanGraph<S, A>, root: S) -> Self {
        Self::compute(graph, root, Traversal::Reachable)
    }

    /// Depths of the expanded frontier reachable from `root`.
    pub fn expanded<A: GraphKey>(graph: &PlanGraph<S, A>, root: S) -> Self {
        Self::compute(graph, root, Traversal::ExpandedOnly)
    }

    /// Run the breadth-first traversal.
    ///
    /// The root is always present at depth 0, even if it is not in the graph.
    /// The first visit of a state fixes its depth.
    pub fn compute<A: GraphKey>(graph: &PlanGraph<S, A>, root: S, traversal: Traversal) -> Self {
        let mut depths = HashMap::new();
        let mut queue = VecDeque::new();
        let mut max_depth = 0;

        depths.insert(root, 0);
        queue.push_back(root);

        while let Some(state) = queue.pop_front() {
            let depth = depths[&state];
            max_depth = max_depth.max(depth);

            for action in graph.actions(&state) {
                for result in graph.resulting_states(&state, &action) {
                    if depths.contains_key(&result) {
                        continue;
                    }
                    if traversal == Traversal::ExpandedOnly && !graph.has_actions(&result) {
                        continue;
                    }
                    depths.insert(result, depth + 1);
                    queue.push_back(result);
                }
            }
        }

        Self {
            root,
            depths,
            max_depth,
        }
    }

    pub fn root(&self) -> S {
        self.root
    }

    pub fn depth(&self, state: &S) -> Option<usize> {
        self.depths.get(state).copied()
    }

    pub fn contains(&self, state: &S) -> bool {
        self.depths.contains_key(state)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &usize)> {
        self.depths.iter()
    }

    /// Group `states` by depth, dropping states the map does not reach.
    pub fn group_by_depth<I>(&self, states: I) -> BTreeMap<usize, Vec<S>>
    where
        I: IntoIterator<Item = S>,
    {
        let mut horizons: BTreeMap<usize, Vec<S>> = BTreeMap::new();
        for state in states {
            if let Some(depth) = self.depth(&state) {
                let bucket = horizons.entry(depth).or_default();
                if !bucket.contains(&state) {
                    bucket.push(state);
                }
            }
        }
        horizons
    }

    /// Number of states at each depth, shallowest first.
    pub fn histogram(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_depth + 1];
        for depth in self.depths.values() {
            counts[*depth] += 1;
        }
        counts
    }
}
