//! plangraph CLI - Anytime probabilistic planning over a grid world
//!
//! This CLI provides:
//! - Planning a route with either selection strategy
//! - Comparing sequential and parallel selection on one world

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plangraph")]
#[command(version, about = "Anytime planner over probabilistic plan graphs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a route and print the optimal actions
    Plan(Box<plangraph::cli::commands::plan::PlanArgs>),

    /// Compare sequential and parallel selection
    Compare(Box<plangraph::cli::commands::compare::CompareArgs>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "plangraph=info",
        1 => "plangraph=debug",
        _ => "plangraph=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plan(args) => plangraph::cli::commands::plan::execute(*args),
        Commands::Compare(args) => plangraph::cli::commands::compare::execute(*args),
    }
}
