use std::fs;
use std::path::Path;
use std::time::Duration;

use maze_core::{
    AgentKind, Direction, Game, GameConfig, GameSnapshot, Grid, MazeError, Position, SchedulerState,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;
const MIN_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(1);

/// Errors returned by a `GameHandle`
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver task has exited (shutdown or panic)
    #[error("game driver has stopped")]
    Stopped,

    /// The game rejected the command, nothing was changed
    #[error(transparent)]
    Rejected(#[from] MazeError),
}

/// Notifications re-published from the game's listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    PositionChanged { position: Position },
    GoalReached,
}

/// Read-only copy of everything a renderer needs
///
/// `grid` is only filled in when the maze may have changed: on a full
/// view, a resize, a restore, or a command that ended on the goal. Other
/// replies leave it out and rely on the caller's copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    pub rows: usize,
    pub cols: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    pub player: Position,
    pub goal: Position,
    /// Exploration memory, sorted
    pub visited: Vec<Position>,
    /// Route of the smart agent, empty otherwise
    pub path: Vec<Position>,
    pub agent: AgentKind,
    pub state: SchedulerState,
    pub speed_multiplier: f64,
    pub memory_enabled: bool,
    pub completions: u64,
    /// Game time in milliseconds
    pub elapsed_ms: u64,
}

impl GameView {
    /// Full view including the grid
    pub fn of(game: &Game) -> Self {
        let mut view = Self::summary(game);
        view.grid = Some(game.state().grid().clone());
        view
    }

    /// Everything but the grid
    pub fn summary(game: &Game) -> Self {
        let state = game.state();
        Self {
            rows: state.grid().rows(),
            cols: state.grid().cols(),
            grid: None,
            player: state.player(),
            goal: game.goal(),
            visited: state.visited().to_sorted_vec(),
            path: game.active_path().to_vec(),
            agent: game.agent_kind(),
            state: game.scheduler_state(),
            speed_multiplier: game.speed_multiplier(),
            memory_enabled: state.memory_enabled(),
            completions: game.completions(),
            elapsed_ms: u64::try_from(game.now().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug)]
enum Request {
    View,
    Move(Direction),
    SetAgent(AgentKind),
    SetSpeed(f64),
    SetMemory(bool),
    Resize { rows: usize, cols: usize },
    Restore(Box<GameSnapshot>),
}

impl Request {
    fn replaces_grid(&self) -> bool {
        matches!(self, Request::View | Request::Resize { .. } | Request::Restore(_))
    }
}

#[derive(Debug)]
enum Command {
    Apply(Request, oneshot::Sender<Result<GameView, MazeError>>),
    Snapshot(oneshot::Sender<GameSnapshot>),
}

/// Cloneable handle to a running game
///
/// Every method is a round trip through the driver task, so calls from
/// different handles are applied one at a time in arrival order.
#[derive(Clone)]
pub struct GameHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<GameEvent>,
}

impl GameHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub async fn view(&self) -> Result<GameView, DriverError> {
        self.apply(Request::View).await
    }

    pub async fn apply_manual_move(&self, direction: Direction) -> Result<GameView, DriverError> {
        self.apply(Request::Move(direction)).await
    }

    pub async fn set_agent(&self, kind: AgentKind) -> Result<GameView, DriverError> {
        self.apply(Request::SetAgent(kind)).await
    }

    pub async fn set_speed_multiplier(&self, factor: f64) -> Result<GameView, DriverError> {
        self.apply(Request::SetSpeed(factor)).await
    }

    pub async fn set_memory_enabled(&self, enabled: bool) -> Result<GameView, DriverError> {
        self.apply(Request::SetMemory(enabled)).await
    }

    pub async fn resize_maze(&self, rows: usize, cols: usize) -> Result<GameView, DriverError> {
        self.apply(Request::Resize { rows, cols }).await
    }

    pub async fn restore(&self, snapshot: GameSnapshot) -> Result<GameView, DriverError> {
        self.apply(Request::Restore(Box::new(snapshot))).await
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, DriverError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| DriverError::Stopped)?;
        response.await.map_err(|_| DriverError::Stopped)
    }

    async fn apply(&self, request: Request) -> Result<GameView, DriverError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Apply(request, reply))
            .await
            .map_err(|_| DriverError::Stopped)?;
        Ok(response.await.map_err(|_| DriverError::Stopped)??)
    }
}

/// Run `game` on its own tokio task
///
/// The task is the only owner of the game. It wakes for commands and for
/// the next timer deadline, and exits when `shutdown` is cancelled or every
/// handle is dropped, returning the game.
pub fn spawn(mut game: Game, shutdown: CancellationToken) -> (GameHandle, JoinHandle<Game>) {
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
    let (events, _) = broadcast::channel(EVENT_BUFFER);

    let position_events = events.clone();
    game.on_position_changed(move |position| {
        // No subscribers is fine
        let _ = position_events.send(GameEvent::PositionChanged { position });
    });
    let goal_events = events.clone();
    game.on_goal_reached(move || {
        let _ = goal_events.send(GameEvent::GoalReached);
    });

    let task = tokio::spawn(run(game, receiver, shutdown));
    (GameHandle { commands, events }, task)
}

async fn run(
    mut game: Game,
    mut commands: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
) -> Game {
    // Game time keeps counting from wherever the game was when spawned
    let offset = game.now();
    let started = Instant::now();
    let clock = move || offset + started.elapsed();

    tracing::info!("Game driver started at {:?} game time", offset);
    loop {
        let wake = game.next_deadline().map(|at| started + at.saturating_sub(offset));

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown requested, stopping game driver");
                break;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::info!("All game handles dropped, stopping game driver");
                    break;
                };
                game.advance_to(clock());
                handle_command(&mut game, command);
            }
            _ = sleep_until(wake) => {
                game.advance_to(clock());
            }
        }
    }
    game
}

async fn sleep_until(wake: Option<Instant>) {
    match wake {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn handle_command(game: &mut Game, command: Command) {
    match command {
        Command::Snapshot(reply) => {
            let _ = reply.send(game.snapshot());
        }
        Command::Apply(request, reply) => {
            let full = request.replaces_grid();
            let completions = game.completions();
            let result = apply_request(game, request).map(|()| {
                // A manual move onto the goal regenerates the maze
                if full || game.completions() != completions {
                    GameView::of(game)
                } else {
                    GameView::summary(game)
                }
            });
            if let Err(e) = &result {
                tracing::warn!("Rejected command: {}", e);
            }
            // The caller may have given up waiting
            let _ = reply.send(result);
        }
    }
}

fn apply_request(game: &mut Game, request: Request) -> Result<(), MazeError> {
    match request {
        Request::View => {}
        Request::Move(direction) => game.apply_manual_move(direction),
        Request::SetAgent(kind) => game.set_agent(kind),
        Request::SetSpeed(factor) => game.set_speed_multiplier(factor)?,
        Request::SetMemory(enabled) => game.set_memory_enabled(enabled),
        Request::Resize { rows, cols } => game.resize_maze(rows, cols)?,
        Request::Restore(snapshot) => game.restore(*snapshot)?,
    }
    Ok(())
}

/// Wait for ctrl-c, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Write a snapshot as pretty JSON
///
/// The file is written next to `path` and renamed over it, so a crash
/// mid-write leaves the previous save intact.
pub fn save_snapshot(
    snapshot: &GameSnapshot,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let partial = format!("{}.partial", path);
    fs::write(&partial, json)?;
    fs::rename(&partial, path)?;
    Ok(())
}

pub fn load_snapshot(path: &str) -> Result<GameSnapshot, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)?;
    let snapshot: GameSnapshot = serde_json::from_str(&json)?;
    snapshot.validate()?;
    Ok(snapshot)
}

/// Read a JSON game config, missing fields take their defaults
pub fn load_config(path: &str) -> Result<GameConfig, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)?;
    let config: GameConfig = serde_json::from_str(&json)?;
    config.validate()?;
    Ok(config)
}

/// Resume the game saved at `path`, or start a new one if there is none
///
/// A file that exists but does not hold a valid snapshot is an error so an
/// autosave never overwrites it.
pub fn load_or_start(config: GameConfig, path: &str) -> Result<Game, Box<dyn std::error::Error>> {
    let mut game = Game::new(config)?;
    if Path::new(path).exists() {
        game.restore(load_snapshot(path)?)?;
        tracing::info!("Resumed saved game from {}", path);
    } else {
        tracing::info!("No saved game at {}, starting fresh", path);
    }
    Ok(game)
}

/// Save the game behind `handle` to `path` every `every`
///
/// The first save happens one interval after the call. The task ends when
/// `shutdown` is cancelled or the driver stops. Failed writes are logged
/// and retried on the next tick.
pub fn autosave(
    handle: GameHandle,
    path: String,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let every = every.max(MIN_AUTOSAVE_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Autosaving to {} every {:?}", path, every);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let Ok(snapshot) = handle.snapshot().await else {
                        tracing::warn!("Game driver stopped, ending autosave");
                        break;
                    };
                    match save_snapshot(&snapshot, &path) {
                        Ok(()) => tracing::debug!("Autosaved game to {}", path),
                        Err(e) => tracing::error!("Autosave to {} failed: {}", path, e),
                    }
                }
            }
        }
    })
}

/// Dimension and seed flags laid over a loaded config
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub seed: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: GameConfig) -> Result<GameConfig, MazeError> {
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Agent, speed and memory flags for a game that is about to run
///
/// Flags left unset keep what the game already has, so a resumed game
/// keeps its saved agent. A fresh game without an agent flag gets the
/// smart agent.
#[derive(Debug, Clone, Default)]
pub struct PlaySettings {
    pub agent: Option<AgentKind>,
    pub speed: Option<f64>,
    pub memory: Option<bool>,
}

impl PlaySettings {
    pub fn apply(&self, game: &mut Game, resumed: bool) -> Result<(), MazeError> {
        if let Some(speed) = self.speed {
            game.set_speed_multiplier(speed)?;
        }
        if let Some(enabled) = self.memory {
            game.set_memory_enabled(enabled);
        }
        match self.agent {
            Some(kind) => game.set_agent(kind),
            None if !resumed => game.set_agent(AgentKind::Smart),
            None => {}
        }
        Ok(())
    }
}

/// Write the `(2R+1)x(2C+1)` wall raster as JSON
pub fn save_raster(grid: &Grid, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(&grid.to_binary_grid())?;
    fs::write(path, json)?;
    Ok(())
}

/// Draw a maze with block characters
///
/// `@` marks the player, `$` the goal and `·` every cell and passage on
/// `path`.
pub fn render_text(grid: &Grid, player: Position, path: &[Position]) -> String {
    let mut raster: Vec<Vec<char>> = grid
        .to_binary_grid()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|open| if open == 1 { ' ' } else { '█' })
                .collect()
        })
        .collect();

    let center = |pos: Position| (pos.y * 2 + 1, pos.x * 2 + 1);
    for pair in path.windows(2) {
        let (r1, c1) = center(pair[0]);
        let (r2, c2) = center(pair[1]);
        raster[(r1 + r2) / 2][(c1 + c2) / 2] = '·';
    }
    for &pos in path {
        let (r, c) = center(pos);
        raster[r][c] = '·';
    }
    let (r, c) = center(grid.exit());
    raster[r][c] = '$';
    if grid.contains(player) {
        let (r, c) = center(player);
        raster[r][c] = '@';
    }

    let mut out = String::with_capacity(raster.len() * (raster[0].len() * 2 + 1));
    for row in raster {
        for ch in row {
            // Double width so cells look square in a terminal
            out.push(ch);
            out.push(if ch == '█' { '█' } else { ' ' });
        }
        out.push('\n');
    }
    out
}
