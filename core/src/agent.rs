//! Autonomous navigation agents
//!
//! Both agents answer one question per tick: where should the player be
//! next? The random agent explores without a goal, the smart agent follows
//! a breadth-first route and replans when the player has left it.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::grid::{Grid, Position};
use crate::memory::VisitedSet;
use crate::pathfind::{find_path, Path};

/// Which agent drives the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Manual play only
    #[default]
    None,
    Random,
    Smart,
}

impl AgentKind {
    /// Fresh agent of this kind, none for `AgentKind::None`
    pub fn build(self) -> Option<Box<dyn NavigationAgent>> {
        match self {
            AgentKind::None => None,
            AgentKind::Random => Some(Box::new(RandomAgent::new())),
            AgentKind::Smart => Some(Box::new(SmartAgent::new())),
        }
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(AgentKind::None),
            "random" => Ok(AgentKind::Random),
            "smart" => Ok(AgentKind::Smart),
            _ => Err(format!("Invalid agent kind: '{}'. Must be 'none', 'random', or 'smart'", s)),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::None => write!(f, "none"),
            AgentKind::Random => write!(f, "random"),
            AgentKind::Smart => write!(f, "smart"),
        }
    }
}

/// Everything an agent may read or touch while deciding
pub struct AgentContext<'a> {
    pub grid: &'a Grid,
    pub goal: Position,
    pub memory: &'a mut VisitedSet,
    /// Loop avoidance for the random agent
    pub memory_enabled: bool,
    pub rng: &'a mut StdRng,
}

impl AgentContext<'_> {
    /// Snap to the goal when `candidate` sits next to it through an open
    /// passage
    fn shortcut(&self, candidate: Position) -> Position {
        if candidate != self.goal && self.grid.opens_onto(candidate, self.goal) {
            self.goal
        } else {
            candidate
        }
    }
}

/// A periodic movement decision maker
pub trait NavigationAgent: Send {
    fn kind(&self) -> AgentKind;

    /// Next player position, `None` when the agent can make no progress
    /// and should stop ticking. Returning `current` means "stay put".
    fn decide_next_position(
        &mut self,
        ctx: &mut AgentContext<'_>,
        current: Position,
    ) -> Option<Position>;

    /// Drop any cached plan, called whenever the maze or player is reset
    fn reset(&mut self) {}

    /// Cached route, empty if the agent does not plan
    fn route(&self) -> &[Position] {
        &[]
    }
}

/// Uniformly random exploration with optional loop avoidance
#[derive(Debug, Default)]
pub struct RandomAgent;

impl RandomAgent {
    pub fn new() -> Self {
        Self
    }
}

impl NavigationAgent for RandomAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Random
    }

    fn decide_next_position(
        &mut self,
        ctx: &mut AgentContext<'_>,
        current: Position,
    ) -> Option<Position> {
        ctx.memory.insert(current);

        let candidates: Vec<Position> = ctx
            .grid
            .open_neighbors(current)
            .map(|(_, next)| next)
            .filter(|&next| !ctx.memory_enabled || !ctx.memory.contains(next))
            .collect();

        match candidates.choose(&mut *ctx.rng) {
            Some(&next) => Some(ctx.shortcut(next)),
            None => {
                if ctx.memory_enabled {
                    // Memory exhausted: forget and pick freely next tick
                    tracing::debug!(
                        "Exploration memory exhausted at {}, clearing {} positions",
                        current,
                        ctx.memory.len()
                    );
                    ctx.memory.clear();
                }
                Some(current)
            }
        }
    }
}

/// Follows a cached shortest route to the goal
#[derive(Debug, Default)]
pub struct SmartAgent {
    path: Path,
    /// Index of the player's position within `path`
    cursor: usize,
}

impl SmartAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while `current` is the route node under the cursor and there
    /// is still a step to take
    fn on_route(&self, current: Position) -> bool {
        self.cursor + 1 < self.path.len() && self.path[self.cursor] == current
    }

    fn replan(&mut self, grid: &Grid, current: Position, goal: Position) {
        self.path = find_path(grid, current, goal);
        self.cursor = 0;
        tracing::debug!(
            "Smart agent planned {} steps from {}",
            self.path.len().saturating_sub(1),
            current
        );
    }
}

impl NavigationAgent for SmartAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Smart
    }

    fn decide_next_position(
        &mut self,
        ctx: &mut AgentContext<'_>,
        current: Position,
    ) -> Option<Position> {
        if current == ctx.goal {
            return None;
        }

        if !self.on_route(current) {
            self.replan(ctx.grid, current, ctx.goal);
            if self.path.len() < 2 {
                tracing::warn!("Smart agent found no route from {} to {}", current, ctx.goal);
                self.path.clear();
                return None;
            }
        }

        self.cursor += 1;
        let next = ctx.shortcut(self.path[self.cursor]);
        if next != self.path[self.cursor] {
            self.cursor = self.path.len() - 1;
        }
        Some(next)
    }

    fn reset(&mut self) {
        self.path.clear();
        self.cursor = 0;
    }

    fn route(&self) -> &[Position] {
        &self.path
    }
}
