//! Compare command - Run both selection strategies on the same world

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use crate::{
    app::SelectionMode,
    cli::{
        commands::plan::{build_planner, route},
        config::{PlannerArgs, WorldArgs},
        output::{format_number, format_value, print_section},
    },
    planner::SearchSummary,
};

#[derive(Parser, Debug)]
#[command(about = "Compare sequential and parallel selection")]
pub struct CompareArgs {
    #[command(flatten)]
    pub world: WorldArgs,

    #[command(flatten)]
    pub planner: PlannerArgs,

    /// Export comparison results to JSON
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Result of one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyResult {
    pub mode: SelectionMode,
    pub summary: SearchSummary,
    pub route_len: usize,
}

pub fn execute(args: CompareArgs) -> Result<()> {
    let (world, start) = args.world.build()?;
    let base = args.planner.resolve()?;
    // Both runs share a seed so the difference comes from the strategy alone.
    let seed = base.seed.unwrap_or(0);

    let mut results = Vec::new();
    for mode in [SelectionMode::Sequential, SelectionMode::Parallel] {
        let config = base.with_selection_mode(mode).with_seed(seed);
        let mut planner = build_planner(&world, start, config)?;
        let summary = planner.search()?;
        let route_len = route(&planner, world.max_steps() as usize)?.len();
        results.push(StrategyResult {
            mode,
            summary,
            route_len,
        });
    }

    print_section("Selection Strategy Comparison");
    println!(
        "  {:<12} {:>10} {:>30} {:>9} {:>8} {:>10}",
        "Mode", "Iterations", "Root value", "Complete", "States", "Time (ms)"
    );
    for result in &results {
        let summary = &result.summary;
        println!(
            "  {:<12} {:>10} {:>30} {:>9} {:>8} {:>10}",
            result.mode.to_string(),
            format_number(summary.iterations as usize),
            format_value(&summary.root_value),
            summary.root_complete,
            format_number(summary.states),
            summary.elapsed_ms
        );
    }
    println!();
    for result in &results {
        println!(
            "  {}: stopped because {}, route of {} steps",
            result.mode, result.summary.stop_reason, result.route_len
        );
    }

    if let Some(output_path) = &args.output {
        let file = std::fs::File::create(output_path)?;
        serde_json::to_writer_pretty(file, &results)?;
        println!("\nResults exported to: {}", output_path.display());
    }

    Ok(())
}
