//! Plan command - Search a grid world and report the optimal route

use std::{fs::File, io::BufWriter, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use crate::{
    adapters::{Cell, Direction, GridState, GridWorld, InMemoryStateContext, ProgressObserver},
    app::PlannerConfig,
    cli::{
        config::{PlannerArgs, WorldArgs},
        output::{format_value, print_kv, print_section, print_subsection, print_summary},
    },
    planner::{Planner, SearchSummary},
    ports::{NoopObserver, PlanObserver, StateDataContext},
};

/// Planner over the demonstration grid world.
pub type GridPlanner = Planner<InMemoryStateContext<GridState>, GridWorld, GridWorld, GridWorld>;

#[derive(Parser, Debug)]
#[command(about = "Plan a route through a grid world")]
pub struct PlanArgs {
    #[command(flatten)]
    pub world: WorldArgs,

    #[command(flatten)]
    pub planner: PlannerArgs,

    /// Longest route to print
    #[arg(long, default_value_t = 50)]
    pub route_len: usize,

    /// Write the summary and route as JSON
    #[arg(long, short = 'o')]
    pub export: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// One step of the greedy route.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RouteStep {
    pub position: Cell,
    pub steps: u32,
    pub action: Direction,
}

#[derive(Debug, Serialize)]
struct PlanExport<'a> {
    world: &'a WorldArgs,
    config: &'a PlannerConfig,
    summary: &'a SearchSummary,
    route: &'a [RouteStep],
}

pub fn execute(args: PlanArgs) -> Result<()> {
    let (world, start) = args.world.build()?;
    let config = args.planner.resolve()?;

    print_section("Grid World Planning");
    print_kv("Grid", &format!("{} x {}", world.width(), world.height()));
    print_kv("Start", &start.to_string());
    print_kv("Goal", &world.goal().to_string());
    print_kv("Max steps", &world.max_steps().to_string());
    print_kv("Selection", &config.selection.mode.to_string());
    print_kv("Budget", &config.selection.budget.to_string());

    let mut planner = build_planner(&world, start, config)?;
    let mut observer: Box<dyn PlanObserver> = if args.no_progress {
        Box::new(NoopObserver)
    } else {
        Box::new(ProgressObserver::new())
    };
    let summary = planner.search_with_observer(observer.as_mut())?;

    print_subsection("Search");
    print_summary(&summary);

    let route = route(&planner, args.route_len)?;
    print_subsection("Optimal route");
    if route.is_empty() {
        println!("  (no action selected at the root)");
    }
    for (i, step) in route.iter().enumerate() {
        println!("  {:>3}. {} -> {}", i + 1, step.position, step.action);
    }
    if let Some((action, info)) = planner.optimal_action() {
        print_kv("First action", &action.to_string());
        print_kv("Action value", &format_value(&info.action_value));
    }

    if let Some(path) = &args.export {
        let export = PlanExport {
            world: &args.world,
            config: planner.config(),
            summary: &summary,
            route: &route,
        };
        let file = File::create(path)
            .with_context(|| format!("creating export file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &export)?;
        println!("\nPlan exported to: {}", path.display());
    }

    Ok(())
}

/// Create a planner rooted at `start`.
pub fn build_planner(world: &GridWorld, start: Cell, config: PlannerConfig) -> Result<GridPlanner> {
    let planner = Planner::new(
        InMemoryStateContext::new(),
        world.clone(),
        world.clone(),
        world.clone(),
        world.start_state(start),
        config,
    )?;
    Ok(planner)
}

/// Resolve the greedy route's keys back to grid states.
pub fn route(planner: &GridPlanner, max_len: usize) -> Result<Vec<RouteStep>> {
    planner
        .optimal_plan(max_len)
        .into_iter()
        .map(|(key, action)| {
            let state = planner.context().state_data(&key)?;
            Ok(RouteStep {
                position: state.position,
                steps: state.steps,
                action,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_walks_towards_the_goal() {
        let world = GridWorld::new(3, 1, Cell::new(2, 0)).with_slip(0.0);
        let config = PlannerConfig::default()
            .with_seed(11)
            .with_max_iterations(200);
        let mut planner = build_planner(&world, Cell::new(0, 0), config).unwrap();
        planner.search().unwrap();

        let route = route(&planner, 10).unwrap();
        let actions: Vec<_> = route.iter().map(|step| step.action).collect();
        assert_eq!(actions, vec![Direction::East, Direction::East]);
        assert_eq!(route[0].position, Cell::new(0, 0));
        assert_eq!(route[1].position, Cell::new(1, 0));
    }
}
