use std::time::Duration;

use clap::{Parser, Subcommand};
use host::{
    autosave, load_config, load_snapshot, render_text, save_raster, save_snapshot,
    shutdown_signal, spawn, ConfigOverrides, GameEvent, PlaySettings,
};
use maze_core::{
    find_path, generate_seeded, path_to_moves, AgentKind, Direction, Game, GameConfig, Position,
    DEFAULT_COLS, DEFAULT_ROWS,
};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "host", version, about = "Idle maze game: generate, solve and watch mazes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a maze and print it
    Generate {
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,
        #[arg(long, default_value_t = DEFAULT_COLS)]
        cols: usize,
        #[arg(long)]
        seed: u64,
        /// Write the wall raster (0 = wall, 1 = open) as JSON
        #[arg(long)]
        output: Option<String>,
    },
    /// Print the shortest route from the start to the goal
    Solve {
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,
        #[arg(long, default_value_t = DEFAULT_COLS)]
        cols: usize,
        #[arg(long)]
        seed: u64,
    },
    /// Run the game in real time and log progress
    Play {
        /// Override the config's maze rows
        #[arg(long)]
        rows: Option<usize>,
        /// Override the config's maze columns
        #[arg(long)]
        cols: Option<usize>,
        /// Override the config's generation seed
        #[arg(long)]
        seed: Option<u64>,
        /// none, random or smart (smart for a new game, the saved one with --load)
        #[arg(long)]
        agent: Option<AgentKind>,
        #[arg(long)]
        speed: Option<f64>,
        /// Loop avoidance for the random agent
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        memory: Option<bool>,
        /// Stop after this many seconds, otherwise wait for ctrl-c
        #[arg(long)]
        seconds: Option<u64>,
        /// JSON game config
        #[arg(long)]
        config: Option<String>,
        /// Resume from a snapshot file
        #[arg(long)]
        load: Option<String>,
        /// Write a snapshot on exit
        #[arg(long)]
        save: Option<String>,
        /// Also write the --save snapshot every this many seconds
        #[arg(long, requires = "save", value_parser = clap::value_parser!(u64).range(1..))]
        autosave: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    println!("🧩 Idle Maze");
    println!("{}", "=".repeat(70));
    println!();

    let result = match cli.command {
        Command::Generate {
            rows,
            cols,
            seed,
            output,
        } => generate_command(rows, cols, seed, output.as_deref()),
        Command::Solve { rows, cols, seed } => solve_command(rows, cols, seed),
        Command::Play {
            rows,
            cols,
            seed,
            agent,
            speed,
            memory,
            seconds,
            config,
            load,
            save,
            autosave,
        } => {
            let options = PlayOptions {
                overrides: ConfigOverrides { rows, cols, seed },
                settings: PlaySettings {
                    agent,
                    speed,
                    memory,
                },
                seconds,
                config,
                load,
                save,
                autosave: autosave.map(Duration::from_secs),
            };
            play_command(options).await
        }
    };

    if let Err(e) = result {
        eprintln!();
        eprintln!("❌ Error: {}", e);
        eprintln!("{}", "=".repeat(70));
        std::process::exit(1);
    }
    println!("{}", "=".repeat(70));
}

fn generate_command(
    rows: usize,
    cols: usize,
    seed: u64,
    output: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("📋 Generating {}x{} maze (seed {})", rows, cols, seed);
    let grid = generate_seeded(rows, cols, seed)?;
    println!();
    print!("{}", render_text(&grid, Position::ORIGIN, &[]));
    println!();
    println!("✅ {} passages carved", grid.passage_count());

    if let Some(path) = output {
        save_raster(&grid, path)?;
        println!("💾 Raster saved to: {}", path);
    }
    Ok(())
}

fn solve_command(rows: usize, cols: usize, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("📋 Solving {}x{} maze (seed {})", rows, cols, seed);
    let grid = generate_seeded(rows, cols, seed)?;
    let path = find_path(&grid, Position::ORIGIN, grid.exit());
    if path.is_empty() {
        return Err(format!("no route from {} to {}", Position::ORIGIN, grid.exit()).into());
    }

    println!();
    print!("{}", render_text(&grid, Position::ORIGIN, &path));
    println!();

    let moves = path_to_moves(&path);
    let names: Vec<&str> = moves.iter().map(|dir| move_name(*dir)).collect();
    println!("✅ Shortest route: {} moves", moves.len());
    println!("  {}", names.join(" "));
    Ok(())
}

fn move_name(direction: Direction) -> &'static str {
    match direction {
        Direction::North => "up",
        Direction::East => "right",
        Direction::South => "down",
        Direction::West => "left",
    }
}

struct PlayOptions {
    overrides: ConfigOverrides,
    settings: PlaySettings,
    seconds: Option<u64>,
    config: Option<String>,
    load: Option<String>,
    save: Option<String>,
    autosave: Option<Duration>,
}

async fn play_command(options: PlayOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = match options.config.as_deref() {
        Some(path) => {
            println!("📦 Loading config from: {}", path);
            load_config(path)?
        }
        None => GameConfig::default(),
    };

    let config = options.overrides.apply(config)?;

    let mut game = Game::new(config)?;
    if let Some(path) = options.load.as_deref() {
        game.restore(load_snapshot(path)?)?;
        println!("📦 Restored snapshot from: {}", path);
    }
    options.settings.apply(&mut game, options.load.is_some())?;

    println!(
        "🎮 {}x{} maze, {} agent, speed x{}",
        game.grid().rows(),
        game.grid().cols(),
        game.agent_kind(),
        game.speed_multiplier()
    );
    match options.seconds {
        Some(seconds) => println!("  Running for {}s (ctrl-c stops early)", seconds),
        None => println!("  Running until ctrl-c"),
    }
    println!();

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(game, shutdown.clone());
    let mut events = handle.subscribe();
    let saver = match (options.save.clone(), options.autosave) {
        (Some(path), Some(every)) => {
            println!("💾 Autosaving to {} every {}s", path, every.as_secs());
            Some(autosave(handle.clone(), path, every, shutdown.clone()))
        }
        _ => None,
    };

    let deadline = async {
        match options.seconds {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => break,
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(GameEvent::GoalReached) => {
                    let view = handle.view().await?;
                    println!("🎊 Goal reached! ({} completions)", view.completions);
                }
                Ok(GameEvent::PositionChanged { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} game events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    shutdown.cancel();
    if let Some(saver) = saver {
        saver.await?;
    }
    let game = driver.await?;

    println!();
    println!("✅ Stopped after {:.1}s of game time", game.now().as_secs_f64());
    println!("  Completions: {}", game.completions());
    println!("  Player at {}", game.player_position());

    if let Some(path) = options.save.as_deref() {
        save_snapshot(&game.snapshot(), path)?;
        println!("💾 Snapshot saved to: {}", path);
    }
    Ok(())
}
