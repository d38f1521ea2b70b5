//! The planning driver: one iteration runs selection, expansion, leaf
//! evaluation and backpropagation in strict sequence over the shared graph.

use std::{fmt, sync::Arc, time::Instant};

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::{
    Result,
    app::PlannerConfig,
    error::{Error, key_string},
    graph::{DepthMap, PlanGraph},
    planner::{
        BackpropParams, ExpansionOutcome, SelectionParams, StateIndex, backpropagate,
        evaluate_leaves, expand, select,
    },
    ports::{
        ActionScheduler, Heuristic, NoopObserver, PlanObserver, StateDataContext,
        TerminationEvaluator,
    },
    types::{ActionInfo, BoundedValue, StateInfo},
    utils::mix_seed,
};

/// What happened during one planning iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationReport {
    /// 1-based iteration number.
    pub iteration: u64,
    /// Distinct states that ended a descent.
    pub selected: usize,
    /// Selected states handed to the scheduler.
    pub expanded: usize,
    pub new_states: usize,
    /// Produced keys merged into an existing state and released.
    pub destroyed_states: usize,
    /// Expanded states for which the scheduler produced nothing.
    pub dead_ends: usize,
    /// States whose value or completeness changed during backpropagation.
    pub backpropagated: usize,
    /// Expansion was skipped because the plan reached `max_states`.
    pub capped: bool,
    pub root_value: BoundedValue,
    pub root_complete: bool,
    pub plan_size: usize,
}

/// Why [`Planner::search`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    MaxIterations,
    RootComplete,
    RootToleranceReached,
    NothingSelected,
    StateLimitReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StopReason::MaxIterations => "iteration limit reached",
            StopReason::RootComplete => "root complete",
            StopReason::RootToleranceReached => "root value within tolerance",
            StopReason::NothingSelected => "nothing left to select",
            StopReason::StateLimitReached => "plan size limit reached",
        };
        f.write_str(label)
    }
}

/// Outcome of a whole search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchSummary {
    pub iterations: u64,
    pub stop_reason: StopReason,
    pub root_value: BoundedValue,
    pub root_complete: bool,
    pub states: usize,
    pub actions: usize,
    pub transitions: usize,
    pub elapsed_ms: u128,
}

/// States dropped by [`Planner::update_root`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub removed: usize,
    pub remaining: usize,
}

/// Anytime planner over a world model supplied through the ports.
///
/// # Examples
///
/// ```
/// use plangraph::{
///     adapters::{Cell, GridWorld, InMemoryStateContext},
///     app::PlannerConfig,
///     planner::Planner,
/// };
///
/// let world = GridWorld::new(3, 3, Cell::new(2, 2)).with_slip(0.0);
/// let config = PlannerConfig::default().with_seed(7).with_max_iterations(500);
/// let start = world.start_state(Cell::new(0, 0));
/// let mut planner = Planner::new(
///     InMemoryStateContext::new(),
///     world.clone(),
///     world.clone(),
///     world,
///     start,
///     config,
/// )?;
///
/// let summary = planner.search()?;
/// assert!(summary.root_complete);
/// assert!(planner.optimal_action().is_some());
/// # Ok::<(), plangraph::Error>(())
/// ```
pub struct Planner<C, H, T, X>
where
    C: StateDataContext,
    X: ActionScheduler<C>,
{
    graph: PlanGraph<C::Key, X::Action>,
    context: C,
    heuristic: H,
    termination: T,
    scheduler: X,
    config: PlannerConfig,
    root: C::Key,
    index: StateIndex<C::Key>,
    iteration: u64,
    base_seed: u64,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl<C, H, T, X> Planner<C, H, T, X>
where
    C: StateDataContext,
    H: Heuristic<C::Data>,
    T: TerminationEvaluator<C::Data>,
    X: ActionScheduler<C>,
{
    /// Register and evaluate `root_data` as the root of a new plan.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a bad config,
    /// [`Error::ThreadPool`] if the dedicated pool cannot start, and any
    /// collaborator failure from evaluating the root.
    pub fn new(
        context: C,
        heuristic: H,
        termination: T,
        scheduler: X,
        root_data: C::Data,
        config: PlannerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let pool = match config.threads {
            Some(threads) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("plangraph-{index}"))
                    .build()
                    .map_err(|e| Error::ThreadPool {
                        message: e.to_string(),
                    })?,
            )),
            None => None,
        };
        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());

        let hash = context.state_hash(&root_data);
        let root = context.register_state(root_data);
        let graph = PlanGraph::new();
        evaluate_leaves(&graph, &context, &heuristic, &termination, &[root])?;

        let mut index = StateIndex::new();
        index.insert(root, hash);

        info!(
            root = ?root,
            mode = %config.selection.mode,
            budget = config.selection.budget,
            seed = base_seed,
            "planner initialised"
        );

        Ok(Self {
            graph,
            context,
            heuristic,
            termination,
            scheduler,
            config,
            root,
            index,
            iteration: 0,
            base_seed,
            pool,
        })
    }

    pub fn graph(&self) -> &PlanGraph<C::Key, X::Action> {
        &self.graph
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn root(&self) -> C::Key {
        self.root
    }

    /// Number of iterations run so far.
    pub fn iterations(&self) -> u64 {
        self.iteration
    }

    /// Current record of the root state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRoot`] if the root record is missing.
    pub fn root_info(&self) -> Result<StateInfo> {
        self.graph
            .state_info(&self.root)
            .ok_or_else(|| Error::UnknownRoot {
                state: key_string(&self.root),
            })
    }

    /// Best action at the root.
    pub fn optimal_action(&self) -> Option<(X::Action, ActionInfo)> {
        self.graph.optimal_action(&self.root)
    }

    /// Greedy route from the root, at most `max_len` steps long.
    pub fn optimal_plan(&self, max_len: usize) -> Vec<(C::Key, X::Action)> {
        self.graph.optimal_plan(self.root, max_len)
    }

    /// Run one iteration of the four phases.
    ///
    /// # Errors
    ///
    /// Consistency violations and collaborator failures abort the iteration.
    /// Phases that already finished keep their effects.
    pub fn run_iteration(&mut self) -> Result<IterationReport> {
        match self.pool.clone() {
            Some(pool) => pool.install(|| self.iterate()),
            None => self.iterate(),
        }
    }

    fn iterate(&mut self) -> Result<IterationReport> {
        self.iteration += 1;
        let iteration = self.iteration;
        let span = info_span!("plan_iteration", iteration);
        let _guard = span.enter();

        let horizon = DepthMap::expanded(&self.graph, self.root);
        let selection = select(
            &self.graph,
            &horizon,
            self.config.selection.mode,
            self.config.selection.budget,
            &SelectionParams::from(&self.config.selection),
            mix_seed(self.base_seed, iteration, 0),
        )?;
        debug!(
            selected = selection.selected.len(),
            unexpanded = selection.unexpanded.len(),
            "selection finished"
        );
        if selection.is_empty() {
            return self.report(iteration, IterationCounts::default());
        }

        let mut counts = IterationCounts {
            selected: selection.selected.len(),
            ..IterationCounts::default()
        };
        let mut seeds = selection.selected.clone();

        let capped = self
            .config
            .limits
            .max_states
            .is_some_and(|max| self.graph.state_count() >= max);
        if capped {
            warn!(
                states = self.graph.state_count(),
                skipped = selection.unexpanded.len(),
                "plan size limit reached, skipping expansion"
            );
            seeds.retain(|state| selection.unexpanded.binary_search(state).is_err());
            counts.capped = true;
        } else if !selection.unexpanded.is_empty() {
            let expansion = self.expand_leaves(&selection.unexpanded)?;
            counts.expanded = selection.unexpanded.len();
            counts.destroyed_states = expansion.destroyed.len();

            for state in &selection.unexpanded {
                if !self.graph.has_actions(state) {
                    self.graph.update_state(state, |info| info.complete = true)?;
                    counts.dead_ends += 1;
                }
            }

            let new_states: Vec<_> = expansion
                .new_states
                .iter()
                .map(|(state, _)| *state)
                .collect();
            evaluate_leaves(
                &self.graph,
                &self.context,
                &self.heuristic,
                &self.termination,
                &new_states,
            )?;
            for (state, hash) in &expansion.new_states {
                self.index.insert(*state, *hash);
            }
            counts.new_states = new_states.len();
            seeds.extend(new_states);
            debug!(
                new = counts.new_states,
                destroyed = counts.destroyed_states,
                dead_ends = counts.dead_ends,
                "expansion finished"
            );
        }

        let depths = DepthMap::reachable(&self.graph, self.root);
        let backprop = backpropagate(
            &self.graph,
            &depths,
            &seeds,
            &BackpropParams {
                discount_factor: self.config.discount_factor,
                value_tolerance: self.config.value_tolerance,
            },
        )?;
        counts.backpropagated = backprop.updated;
        debug!(
            updated = backprop.updated,
            horizons = backprop.horizons,
            "backpropagation finished"
        );
        debug_assert!(self.graph.check_consistency().is_ok());

        self.report(iteration, counts)
    }

    fn expand_leaves(&mut self, leaves: &[C::Key]) -> Result<ExpansionOutcome<C::Key>> {
        let batch = self.scheduler.schedule(&self.context, leaves)?;
        self.graph.expand(batch.len(), batch.len());
        let outcome = expand(&self.graph, &self.context, &self.index, &batch)?;
        for duplicate in &outcome.destroyed {
            self.context.destroy_state(duplicate)?;
        }
        Ok(outcome)
    }

    fn report(&self, iteration: u64, counts: IterationCounts) -> Result<IterationReport> {
        let root = self.root_info()?;
        Ok(IterationReport {
            iteration,
            selected: counts.selected,
            expanded: counts.expanded,
            new_states: counts.new_states,
            destroyed_states: counts.destroyed_states,
            dead_ends: counts.dead_ends,
            backpropagated: counts.backpropagated,
            capped: counts.capped,
            root_value: root.policy_value,
            root_complete: root.complete,
            plan_size: self.graph.state_count(),
        })
    }

    /// Run iterations until a stopping rule from the config fires.
    ///
    /// # Errors
    ///
    /// Propagates the first failing iteration.
    pub fn search(&mut self) -> Result<SearchSummary> {
        self.search_with_observer(&mut NoopObserver)
    }

    /// [`Planner::search`], reporting progress to `observer`.
    ///
    /// # Errors
    ///
    /// Propagates the first failing iteration or observer callback.
    pub fn search_with_observer(
        &mut self,
        observer: &mut dyn PlanObserver,
    ) -> Result<SearchSummary> {
        let started = Instant::now();
        let limits = self.config.limits;
        observer.on_search_start(limits.max_iterations)?;

        let mut iterations = 0u64;
        let stop_reason = loop {
            if let Some(reason) = self.root_stop_reason()? {
                break reason;
            }
            if iterations >= limits.max_iterations {
                break StopReason::MaxIterations;
            }

            let report = self.run_iteration()?;
            iterations += 1;
            observer.on_iteration(&report)?;

            if report.selected == 0 {
                break StopReason::NothingSelected;
            }
            if report.capped && report.backpropagated == 0 {
                break StopReason::StateLimitReached;
            }
        };

        let root = self.root_info()?;
        let summary = SearchSummary {
            iterations,
            stop_reason,
            root_value: root.policy_value,
            root_complete: root.complete,
            states: self.graph.state_count(),
            actions: self.graph.action_count(),
            transitions: self.graph.transition_count(),
            elapsed_ms: started.elapsed().as_millis(),
        };
        info!(
            iterations,
            reason = %stop_reason,
            root_value = %summary.root_value,
            states = summary.states,
            "search finished"
        );
        observer.on_search_end(&summary)?;
        Ok(summary)
    }

    fn root_stop_reason(&self) -> Result<Option<StopReason>> {
        let root = self.root_info()?;
        let limits = &self.config.limits;
        if limits.stop_when_complete && root.complete {
            return Ok(Some(StopReason::RootComplete));
        }
        if let Some(tolerance) = limits.root_range_tolerance
            && root.policy_value.range() <= tolerance
        {
            return Ok(Some(StopReason::RootToleranceReached));
        }
        Ok(None)
    }

    /// Move the root to `new_root` and drop every state it cannot reach.
    ///
    /// Removed states are released through the state context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRoot`] if `new_root` is not in the plan.
    pub fn update_root(&mut self, new_root: C::Key) -> Result<PruneReport> {
        if !self.graph.contains_state(&new_root) {
            return Err(Error::UnknownRoot {
                state: key_string(&new_root),
            });
        }

        let reachable = DepthMap::reachable(&self.graph, new_root);
        let stale: Vec<_> = self
            .graph
            .state_keys()
            .into_iter()
            .filter(|state| !reachable.contains(state))
            .collect();

        for state in &stale {
            self.graph.remove_state(state)?;
            self.index.remove(state);
            self.context.destroy_state(state)?;
        }
        self.root = new_root;

        let report = PruneReport {
            removed: stale.len(),
            remaining: self.graph.state_count(),
        };
        info!(
            root = ?new_root,
            removed = report.removed,
            remaining = report.remaining,
            "plan re-rooted"
        );
        Ok(report)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct IterationCounts {
    selected: usize,
    expanded: usize,
    new_states: usize,
    destroyed_states: usize,
    dead_ends: usize,
    backpropagated: usize,
    capped: bool,
}
