//! Shared types, constants, and logic for the idle maze game
//!
//! This crate holds everything the game needs that does not touch a
//! display, a clock or a disk:
//!
//! - grid storage and adjacency queries
//! - perfect maze generation (recursive backtracker)
//! - breadth-first route finding
//! - the random and smart navigation agents
//! - a virtual-clock timer queue and the agent scheduler state machine
//! - the `Game` controller that ties them together
//!
//! Time is always a `Duration` since the game started. Host crates map it
//! onto a real clock.

pub mod agent;
pub mod config;
pub mod error;
pub mod game;
pub mod grid;
pub mod maze_gen;
pub mod memory;
pub mod pathfind;
pub mod scheduler;
pub mod snapshot;
pub mod timer;

// Re-export commonly used types for convenience
pub use agent::{AgentContext, AgentKind, NavigationAgent, RandomAgent, SmartAgent};
pub use config::{GameConfig, TimingConfig};
pub use error::MazeError;
pub use game::{Game, GameState};
pub use grid::{Cell, Direction, Grid, Position};
pub use maze_gen::{generate, generate_seeded};
pub use memory::VisitedSet;
pub use pathfind::{find_path, is_valid_path, path_to_moves, Path};
pub use scheduler::{AgentScheduler, SchedulerState, TickOutcome};
pub use snapshot::GameSnapshot;
pub use timer::{TimerId, TimerKind, TimerQueue};

/// Default maze dimensions (cells, not including walls)
pub const DEFAULT_ROWS: usize = 10;
pub const DEFAULT_COLS: usize = 10;

/// Largest accepted value for either maze dimension
pub const MAX_MAZE_DIMENSION: usize = 256;

/// Base tick interval of the random agent at speed 1.0
pub const RANDOM_BASE_INTERVAL_MS: u64 = 200;

/// Base tick interval of the smart agent at speed 1.0
pub const SMART_BASE_INTERVAL_MS: u64 = 150;

/// Lower bound on the tick interval, whatever the speed multiplier
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Delay after the last manual input before the agent takes over again
pub const RESUME_DELAY_MS: u64 = 2000;

/// Snapshot format version written by `Game::snapshot`
pub const SNAPSHOT_VERSION: u32 = 1;
