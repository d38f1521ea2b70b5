//! Shared argument groups for CLI commands

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{
    adapters::{Cell, GridWorld},
    app::{PlannerConfig, SelectionMode},
};

/// Grid world description
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct WorldArgs {
    /// Grid width in cells
    #[arg(long, default_value_t = 5)]
    pub width: u32,

    /// Grid height in cells
    #[arg(long, default_value_t = 5)]
    pub height: u32,

    /// Start cell as `x,y`
    #[arg(long, default_value = "0,0")]
    pub start: String,

    /// Goal cell as `x,y` (defaults to the far corner)
    #[arg(long)]
    pub goal: Option<String>,

    /// Wall cells as `x,y` (repeatable)
    #[arg(long = "wall")]
    pub walls: Vec<String>,

    /// Pit cells as `x,y` (repeatable)
    #[arg(long = "pit")]
    pub pits: Vec<String>,

    /// Probability of slipping sideways on each move
    #[arg(long, default_value_t = 0.2)]
    pub slip: f64,

    /// Cost paid for every move
    #[arg(long, default_value_t = 1.0)]
    pub step_cost: f64,

    /// Reward for reaching the goal
    #[arg(long, default_value_t = 10.0)]
    pub goal_reward: f64,

    /// Episode length in moves (defaults to the grid perimeter)
    #[arg(long)]
    pub max_steps: Option<u32>,
}

impl WorldArgs {
    /// Build and validate the world and its start cell.
    pub fn build(&self) -> Result<(GridWorld, Cell)> {
        let goal = match &self.goal {
            Some(text) => parse_cell(text)?,
            None => Cell::new(
                self.width.saturating_sub(1),
                self.height.saturating_sub(1),
            ),
        };
        let start = parse_cell(&self.start)?;

        let mut world = GridWorld::new(self.width, self.height, goal)
            .with_slip(self.slip)
            .with_step_cost(self.step_cost)
            .with_goal_reward(self.goal_reward);
        if let Some(steps) = self.max_steps {
            world = world.with_max_steps(steps);
        }
        for wall in &self.walls {
            world = world.with_wall(parse_cell(wall)?);
        }
        for pit in &self.pits {
            world = world.with_pit(parse_cell(pit)?);
        }
        world.validate()?;

        if start.x >= self.width || start.y >= self.height {
            return Err(anyhow!("start cell {start} lies outside the grid"));
        }
        Ok((world, start))
    }
}

/// Planner tuning flags; explicit flags override the config file.
#[derive(Args, Debug, Clone)]
pub struct PlannerArgs {
    /// JSON planner configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of planning iterations
    #[arg(long, short = 'n')]
    pub iterations: Option<u64>,

    /// Descents per iteration
    #[arg(long, short = 'b')]
    pub budget: Option<u32>,

    /// Selection strategy (`sequential` or `parallel`)
    #[arg(long)]
    pub mode: Option<SelectionMode>,

    /// Discount factor in (0, 1]
    #[arg(long)]
    pub discount: Option<f64>,

    /// Stop expanding once the plan holds this many states
    #[arg(long)]
    pub max_states: Option<usize>,

    /// Worker threads (defaults to the global pool)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,
}

impl PlannerArgs {
    /// Resolve the effective planner configuration.
    pub fn resolve(&self) -> Result<PlannerConfig> {
        let mut config = match &self.config {
            Some(path) => PlannerConfig::from_json_file(path)
                .with_context(|| format!("loading planner config {}", path.display()))?,
            None => PlannerConfig::default(),
        };

        if let Some(iterations) = self.iterations {
            config = config.with_max_iterations(iterations);
        }
        if let Some(budget) = self.budget {
            config = config.with_selection_budget(budget);
        }
        if let Some(mode) = self.mode {
            config = config.with_selection_mode(mode);
        }
        if let Some(discount) = self.discount {
            config = config.with_discount_factor(discount);
        }
        if let Some(states) = self.max_states {
            config = config.with_max_states(states);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parse an `x,y` cell.
pub fn parse_cell(text: &str) -> Result<Cell> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid cell '{text}': expected x,y"))?;
    let x = x
        .trim()
        .parse()
        .with_context(|| format!("invalid x coordinate in '{text}'"))?;
    let y = y
        .trim()
        .parse()
        .with_context(|| format!("invalid y coordinate in '{text}'"))?;
    Ok(Cell::new(x, y))
}
