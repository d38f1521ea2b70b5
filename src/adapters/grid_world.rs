//! Slippery grid world, a small stochastic domain implementing every port.
//!
//! The agent moves between cells of a `width x height` grid. A move goes in
//! the intended direction with probability `1 - slip` and slips to either
//! perpendicular direction with probability `slip / 2`. Moves into walls or
//! off the grid leave the agent in place. Every move costs `step_cost`.
//!
//! The episode ends on the goal cell (reward `goal_reward`), on a pit
//! (reward `-pit_penalty`) or after `max_steps` moves (reward 0). The step
//! counter is part of the state, so the state space is acyclic and a plan can
//! become complete.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    ports::{
        ActionScheduler, Heuristic, ScheduledTransition, StateDataContext, Termination,
        TerminationEvaluator,
    },
    types::{BoundedValue, StateTransitionInfo},
};

/// Grid coordinates; `y` grows southwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Agent position plus the number of moves already made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridState {
    pub position: Cell,
    pub steps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// The two directions a slip can take the agent.
    pub fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::North | Direction::South => [Direction::East, Direction::West],
            Direction::East | Direction::West => [Direction::North, Direction::South],
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        f.write_str(label)
    }
}

/// World description shared by the scheduler, heuristic and termination check.
///
/// # Examples
///
/// ```
/// use plangraph::adapters::{Cell, Direction, GridWorld};
///
/// let world = GridWorld::new(4, 3, Cell::new(3, 0))
///     .with_wall(Cell::new(1, 1))
///     .with_pit(Cell::new(3, 1))
///     .with_slip(0.2);
/// assert!(world.validate().is_ok());
///
/// let outcomes = world.outcomes(Cell::new(0, 0), Direction::East);
/// let total: f64 = outcomes.iter().map(|(_, p)| p).sum();
/// assert!((total - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GridWorld {
    width: u32,
    height: u32,
    goal: Cell,
    goal_reward: f64,
    pits: BTreeSet<Cell>,
    pit_penalty: f64,
    walls: BTreeSet<Cell>,
    step_cost: f64,
    slip: f64,
    max_steps: u32,
}

impl GridWorld {
    /// A grid with one goal, no walls or pits, slip 0.2 and unit step cost.
    pub fn new(width: u32, height: u32, goal: Cell) -> Self {
        Self {
            width,
            height,
            goal,
            goal_reward: 10.0,
            pits: BTreeSet::new(),
            pit_penalty: 10.0,
            walls: BTreeSet::new(),
            step_cost: 1.0,
            slip: 0.2,
            max_steps: width.saturating_add(height).saturating_mul(2),
        }
    }

    pub fn with_goal_reward(mut self, reward: f64) -> Self {
        self.goal_reward = reward;
        self
    }

    pub fn with_pit(mut self, cell: Cell) -> Self {
        self.pits.insert(cell);
        self
    }

    pub fn with_pit_penalty(mut self, penalty: f64) -> Self {
        self.pit_penalty = penalty;
        self
    }

    pub fn with_wall(mut self, cell: Cell) -> Self {
        self.walls.insert(cell);
        self
    }

    pub fn with_step_cost(mut self, cost: f64) -> Self {
        self.step_cost = cost;
        self
    }

    pub fn with_slip(mut self, slip: f64) -> Self {
        self.slip = slip;
        self
    }

    pub fn with_max_steps(mut self, steps: u32) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// The state of an agent standing on `cell` before its first move.
    pub fn start_state(&self, cell: Cell) -> GridState {
        GridState {
            position: cell,
            steps: 0,
        }
    }

    fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Check dimensions, probabilities and cell placement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::InvalidConfiguration { message });

        if self.width == 0 || self.height == 0 {
            return invalid(format!(
                "grid must be non-empty, got {}x{}",
                self.width, self.height
            ));
        }
        if !(0.0..1.0).contains(&self.slip) {
            return invalid(format!("slip must lie in [0, 1), got {}", self.slip));
        }
        if self.step_cost < 0.0 || self.pit_penalty < 0.0 {
            return invalid("step cost and pit penalty must be non-negative".to_string());
        }
        if !self.contains(self.goal) || self.walls.contains(&self.goal) {
            return invalid(format!("goal {} must be an open cell on the grid", self.goal));
        }
        if let Some(cell) = self.pits.iter().chain(&self.walls).find(|c| !self.contains(**c)) {
            return invalid(format!("cell {cell} lies outside the grid"));
        }
        if self.max_steps == 0 {
            return invalid("max_steps must be at least 1".to_string());
        }
        Ok(())
    }

    /// Where a single move in `direction` from `cell` lands.
    pub fn step(&self, cell: Cell, direction: Direction) -> Cell {
        let (dx, dy) = direction.delta();
        let x = i64::from(cell.x) + dx;
        let y = i64::from(cell.y) + dy;
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return cell;
        };
        let target = Cell::new(x, y);
        if !self.contains(target) || self.walls.contains(&target) {
            return cell;
        }
        target
    }

    /// Landing cells of an intended move with their probabilities.
    ///
    /// Outcomes that land on the same cell are merged; zero-probability
    /// outcomes are omitted.
    pub fn outcomes(&self, cell: Cell, direction: Direction) -> Vec<(Cell, f64)> {
        let mut landing: BTreeMap<Cell, f64> = BTreeMap::new();
        *landing.entry(self.step(cell, direction)).or_default() += 1.0 - self.slip;
        if self.slip > 0.0 {
            for side in direction.perpendicular() {
                *landing.entry(self.step(cell, side)).or_default() += self.slip / 2.0;
            }
        }
        landing.into_iter().filter(|(_, p)| *p > 0.0).collect()
    }

    fn termination(&self, state: &GridState) -> Termination {
        if state.position == self.goal {
            Termination::terminal(self.goal_reward)
        } else if self.pits.contains(&state.position) {
            Termination::terminal(-self.pit_penalty)
        } else if state.steps >= self.max_steps {
            Termination::terminal(0.0)
        } else {
            Termination::non_terminal()
        }
    }
}

impl TerminationEvaluator<GridState> for GridWorld {
    fn evaluate(&self, state: &GridState) -> Result<Termination> {
        Ok(self.termination(state))
    }
}

/// Manhattan-distance bounds.
///
/// The upper bound walks straight to the goal when it is still reachable in
/// the remaining moves, otherwise no positive reward is possible. The lower
/// bound pays for every remaining move and, if the grid has pits, a pit.
impl Heuristic<GridState> for GridWorld {
    fn evaluate(&self, state: &GridState) -> Result<BoundedValue> {
        let remaining = self.max_steps.saturating_sub(state.steps);
        let distance = state.position.manhattan(&self.goal);

        let upper = if distance <= remaining {
            self.goal_reward - f64::from(distance) * self.step_cost
        } else {
            0.0
        };
        let pit = if self.pits.is_empty() {
            0.0
        } else {
            self.pit_penalty
        };
        let lower = -f64::from(remaining) * self.step_cost - pit;

        Ok(BoundedValue::new(lower.min(upper), upper, upper))
    }
}

impl<C> ActionScheduler<C> for GridWorld
where
    C: StateDataContext<Data = GridState>,
{
    type Action = Direction;

    fn schedule(
        &self,
        context: &C,
        states: &[C::Key],
    ) -> Result<Vec<ScheduledTransition<C::Key, Direction>>> {
        let per_state = states
            .par_iter()
            .map(|key| {
                let data = context.state_data(key)?;
                if self.termination(&data).is_terminal {
                    return Ok(Vec::new());
                }

                let mut scheduled = Vec::new();
                for direction in Direction::ALL {
                    for (cell, probability) in self.outcomes(data.position, direction) {
                        let successor = context.register_state(GridState {
                            position: cell,
                            steps: data.steps + 1,
                        });
                        let transition = StateTransitionInfo::new(probability, -self.step_cost)?;
                        scheduled.push(ScheduledTransition::new(
                            *key, direction, successor, transition,
                        ));
                    }
                }
                Ok(scheduled)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(per_state.into_iter().flatten().collect())
    }
}
