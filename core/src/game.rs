//! Game controller
//!
//! `Game` is the single owner of all mutable game state: the grid, the
//! player position, the exploration memory, the scheduler and its timers.
//! Every entry point takes `&mut self`, so calls are serialized by
//! construction and no component holds a long-lived reference into it.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::agent::{AgentContext, AgentKind};
use crate::config::{validate_dimensions, GameConfig};
use crate::error::MazeError;
use crate::grid::{Direction, Grid, Position};
use crate::maze_gen::generate;
use crate::memory::VisitedSet;
use crate::scheduler::{AgentScheduler, SchedulerState, TickOutcome};
use crate::timer::{TimerId, TimerKind, TimerQueue};

type PositionListener = Box<dyn FnMut(Position) + Send>;
type GoalListener = Box<dyn FnMut() + Send>;

/// Mutable game data handed to agents by reference
pub struct GameState {
    grid: Grid,
    player: Position,
    visited: VisitedSet,
    memory_enabled: bool,
    rng: StdRng,
}

impl GameState {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self) -> Position {
        self.player
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn memory_enabled(&self) -> bool {
        self.memory_enabled
    }
}

pub struct Game {
    state: GameState,
    scheduler: AgentScheduler,
    timers: TimerQueue,
    completions: u64,
    position_listeners: Vec<PositionListener>,
    goal_listeners: Vec<GoalListener>,
}

impl Game {
    /// Start a game on a freshly generated maze, player at (0, 0), no agent
    pub fn new(config: GameConfig) -> Result<Self, MazeError> {
        config.validate()?;
        let mut rng = new_rng(config.seed);
        let grid = generate(config.rows, config.cols, &mut rng)?;
        tracing::info!("Generated {}x{} maze", config.rows, config.cols);
        Ok(Self::assemble(config, grid, rng))
    }

    /// Start a game on an existing grid
    ///
    /// Later regenerations use the grid's dimensions, not the config's.
    pub fn with_grid(config: GameConfig, grid: Grid) -> Result<Self, MazeError> {
        config.timing.validate()?;
        grid.validate()?;
        let rng = new_rng(config.seed);
        Ok(Self::assemble(config, grid, rng))
    }

    fn assemble(config: GameConfig, grid: Grid, rng: StdRng) -> Self {
        let scheduler = AgentScheduler::new(config.timing.clone());
        Self {
            state: GameState {
                grid,
                player: Position::ORIGIN,
                visited: VisitedSet::new(),
                memory_enabled: false,
                rng,
            },
            scheduler,
            timers: TimerQueue::new(),
            completions: 0,
            position_listeners: Vec::new(),
            goal_listeners: Vec::new(),
        }
    }

    /// Everything an agent sees, in one borrow
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn grid(&self) -> &Grid {
        &self.state.grid
    }

    pub fn player_position(&self) -> Position {
        self.state.player
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.state.visited
    }

    /// Route the smart agent is following, empty otherwise
    pub fn active_path(&self) -> &[Position] {
        self.scheduler.route()
    }

    pub fn goal(&self) -> Position {
        self.state.grid.exit()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn agent_kind(&self) -> AgentKind {
        self.scheduler.kind()
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.scheduler.speed_multiplier()
    }

    pub fn memory_enabled(&self) -> bool {
        self.state.memory_enabled
    }

    /// Number of times the goal has been reached
    pub fn completions(&self) -> u64 {
        self.completions
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// When the next timer is due, none while nothing is scheduled
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Register a callback fired whenever the player position changes
    pub fn on_position_changed(&mut self, listener: impl FnMut(Position) + Send + 'static) {
        self.position_listeners.push(Box::new(listener));
    }

    /// Register a callback fired each time the goal is reached
    pub fn on_goal_reached(&mut self, listener: impl FnMut() + Send + 'static) {
        self.goal_listeners.push(Box::new(listener));
    }

    /// Replace the maze with a fresh one of the given size
    pub fn resize_maze(&mut self, rows: usize, cols: usize) -> Result<(), MazeError> {
        validate_dimensions(rows, cols)?;
        self.regenerate(rows, cols)?;
        self.scheduler.on_maze_regenerated(&mut self.timers);
        Ok(())
    }

    pub fn set_agent(&mut self, kind: AgentKind) {
        self.scheduler.start(kind, &mut self.timers);
    }

    pub fn set_speed_multiplier(&mut self, factor: f64) -> Result<(), MazeError> {
        self.scheduler.set_speed_multiplier(factor, &mut self.timers)
    }

    pub fn set_memory_enabled(&mut self, enabled: bool) {
        self.state.memory_enabled = enabled;
    }

    /// Keyboard, button or gesture input
    ///
    /// Suspends an active agent first, then moves if the wall is open.
    /// Walking into a wall changes nothing.
    pub fn apply_manual_move(&mut self, direction: Direction) {
        self.scheduler.on_manual_input(&mut self.timers);
        if let Some(next) = self.state.grid.step(self.state.player, direction) {
            self.move_player(next);
        }
    }

    /// Run every timer due up to `now`, in order, then set the clock to `now`
    pub fn advance_to(&mut self, now: Duration) {
        while let Some((id, kind)) = self.timers.pop_due(now) {
            self.fire(id, kind);
        }
        self.timers.advance_clock(now);
    }

    pub fn advance(&mut self, by: Duration) {
        self.advance_to(self.now() + by);
    }

    fn fire(&mut self, id: TimerId, kind: TimerKind) {
        match kind {
            TimerKind::AgentTick => {
                let current = self.state.player;
                let mut ctx = AgentContext {
                    grid: &self.state.grid,
                    goal: self.state.grid.exit(),
                    memory: &mut self.state.visited,
                    memory_enabled: self.state.memory_enabled,
                    rng: &mut self.state.rng,
                };
                let outcome = self.scheduler.tick(id, &mut ctx, current, &mut self.timers);
                if let TickOutcome::Moved(next) = outcome {
                    self.move_player(next);
                }
            }
            TimerKind::Resume => {
                self.scheduler.resume(id, &mut self.timers);
            }
        }
    }

    fn move_player(&mut self, next: Position) {
        if next == self.state.player {
            return;
        }
        self.state.player = next;
        self.notify_position();

        if next == self.goal() {
            self.handle_goal_reached();
        }
    }

    fn handle_goal_reached(&mut self) {
        self.completions += 1;
        tracing::info!("Goal reached ({} completions)", self.completions);
        for listener in &mut self.goal_listeners {
            listener();
        }

        let (rows, cols) = (self.state.grid.rows(), self.state.grid.cols());
        if let Err(e) = self.regenerate(rows, cols) {
            tracing::error!("Failed to regenerate maze: {}", e);
            return;
        }
        self.scheduler.on_maze_regenerated(&mut self.timers);
    }

    /// New grid, player back at the start, memory cleared
    fn regenerate(&mut self, rows: usize, cols: usize) -> Result<(), MazeError> {
        self.state.grid = generate(rows, cols, &mut self.state.rng)?;
        self.state.visited.clear();
        tracing::info!("Generated {}x{} maze", rows, cols);

        if self.state.player != Position::ORIGIN {
            self.state.player = Position::ORIGIN;
            self.notify_position();
        }
        Ok(())
    }

    fn notify_position(&mut self) {
        let pos = self.state.player;
        for listener in &mut self.position_listeners {
            listener(pos);
        }
    }

    /// Swap in already validated state, agent and speed are set separately
    pub(crate) fn restore_parts(
        &mut self,
        grid: Grid,
        player: Position,
        visited: VisitedSet,
        memory_enabled: bool,
        completions: u64,
    ) {
        self.state.grid = grid;
        self.state.visited = visited;
        self.state.memory_enabled = memory_enabled;
        self.completions = completions;
        if self.state.player != player {
            self.state.player = player;
            self.notify_position();
        }
    }
}

fn new_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
