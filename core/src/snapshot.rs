//! Saved games
//!
//! A snapshot holds the whole grid rather than a generation seed, so a
//! restored game shows exactly the maze that was saved regardless of how
//! it was produced. Timers are not saved: a restored agent starts ticking
//! from a fresh interval.

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::config::validate_speed;
use crate::error::MazeError;
use crate::game::Game;
use crate::grid::{Grid, Position};
use crate::memory::VisitedSet;
use crate::SNAPSHOT_VERSION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub version: u32,
    pub grid: Grid,
    pub player: Position,
    pub visited: VisitedSet,
    pub agent: AgentKind,
    pub speed_multiplier: f64,
    pub memory_enabled: bool,
    #[serde(default)]
    pub completions: u64,
}

impl GameSnapshot {
    /// Reject anything a running game could not have produced
    pub fn validate(&self) -> Result<(), MazeError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(MazeError::UnsupportedSnapshot(self.version));
        }
        self.grid.validate()?;
        if !self.grid.is_perfect() {
            return Err(MazeError::CorruptGrid("grid is not a perfect maze"));
        }
        self.grid.check(self.player)?;
        // Reaching the goal regenerates at once, except on a single cell
        if self.player == self.grid.exit() && self.grid.exit() != Position::ORIGIN {
            return Err(MazeError::CorruptGrid("player saved on the goal cell"));
        }
        for pos in self.visited.iter() {
            self.grid.check(pos)?;
        }
        validate_speed(self.speed_multiplier)
    }
}

impl Game {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            version: SNAPSHOT_VERSION,
            grid: self.grid().clone(),
            player: self.player_position(),
            visited: self.visited().clone(),
            agent: self.agent_kind(),
            speed_multiplier: self.speed_multiplier(),
            memory_enabled: self.memory_enabled(),
            completions: self.completions(),
        }
    }

    /// Replace the running game with a saved one
    ///
    /// Nothing changes unless the whole snapshot is valid. A saved agent
    /// comes back in autonomous mode even if it was overridden when saved.
    pub fn restore(&mut self, snapshot: GameSnapshot) -> Result<(), MazeError> {
        snapshot.validate()?;

        let GameSnapshot {
            grid,
            player,
            visited,
            agent,
            speed_multiplier,
            memory_enabled,
            completions,
            ..
        } = snapshot;

        tracing::info!(
            "Restoring {}x{} maze with player at {} and {} agent",
            grid.rows(),
            grid.cols(),
            player,
            agent
        );
        self.set_agent(AgentKind::None);
        self.restore_parts(grid, player, visited, memory_enabled, completions);
        self.set_speed_multiplier(speed_multiplier)?;
        self.set_agent(agent);
        Ok(())
    }
}
