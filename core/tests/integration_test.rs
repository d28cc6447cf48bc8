use std::sync::{Arc, Mutex};
use std::time::Duration;

use maze_core::{
    find_path, generate_seeded, AgentKind, Direction, Game, GameConfig, Grid, Position,
    SchedulerState, TimerKind,
};

const MAZE_SEED: u64 = 2918957128;

fn seeded_config() -> GameConfig {
    GameConfig {
        seed: Some(MAZE_SEED),
        ..GameConfig::default()
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_generated_maze_is_perfect() {
    println!("🧪 Testing generated maze structure...");

    for (rows, cols) in [(1, 1), (1, 12), (12, 1), (10, 10), (31, 17)] {
        let grid = generate_seeded(rows, cols, MAZE_SEED).expect("Maze generation failed");
        assert!(grid.is_perfect(), "{}x{} maze should be a spanning tree", rows, cols);
        assert!(grid.validate().is_ok(), "{}x{} maze should have paired walls", rows, cols);

        let route = find_path(&grid, Position::ORIGIN, grid.exit());
        assert_eq!(route.first(), Some(&Position::ORIGIN));
        assert_eq!(route.last(), Some(&grid.exit()));
    }

    println!("✅ Generated maze structure test passed!");
}

#[test]
fn test_manual_moves_on_hand_built_grid() {
    println!("🧪 Testing manual moves...");

    let mut grid = Grid::new(4, 4).expect("Grid creation failed");
    grid.open_passage(Position::new(0, 0), Direction::East).unwrap();
    grid.open_passage(Position::new(1, 0), Direction::East).unwrap();
    grid.open_passage(Position::new(2, 0), Direction::South).unwrap();
    let mut game = Game::with_grid(seeded_config(), grid).expect("Game creation failed");

    // Wall into the north boundary, then the open corridor
    game.apply_manual_move(Direction::North);
    assert_eq!(game.player_position(), Position::ORIGIN);
    for dir in ["right", "right", "down"] {
        game.apply_manual_move(dir.parse().expect("Direction parse failed"));
    }
    assert_eq!(game.player_position(), Position::new(2, 1));
    assert_eq!(game.completions(), 0);

    println!("✅ Manual moves test passed!");
}

#[test]
fn test_smart_agent_runs_many_mazes() {
    println!("🧪 Testing smart agent across consecutive mazes...");

    let mut game = Game::new(seeded_config()).expect("Game creation failed");
    let goals = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&goals);
    game.on_goal_reached(move || *counter.lock().unwrap() += 1);
    game.set_agent(AgentKind::Smart);

    // 10x10 routes are at most 99 steps, so a minute covers several mazes
    game.advance(Duration::from_secs(60));

    let reached = *goals.lock().unwrap();
    assert!(reached >= 3, "smart agent should solve several mazes, solved {}", reached);
    assert_eq!(u64::from(reached), game.completions());
    assert_eq!(game.scheduler_state(), SchedulerState::Autonomous);
    assert_eq!(
        game.timers().pending(TimerKind::AgentTick),
        1,
        "exactly one tick timer should be armed"
    );

    println!("✅ Smart agent test passed!");
}

#[test]
fn test_random_agent_eventually_solves() {
    println!("🧪 Testing random agent with memory...");

    let config = GameConfig {
        rows: 5,
        cols: 5,
        ..seeded_config()
    };
    let mut game = Game::new(config).expect("Game creation failed");
    game.set_memory_enabled(true);
    game.set_agent(AgentKind::Random);
    game.set_speed_multiplier(10.0).expect("Speed should be accepted");

    game.advance(Duration::from_secs(120));
    assert!(game.completions() > 0, "random agent should reach the goal eventually");
    assert_eq!(game.agent_kind(), AgentKind::Random);

    println!("✅ Random agent test passed!");
}

#[test]
fn test_manual_override_timeline() {
    println!("🧪 Testing manual override timeline...");

    let mut game = Game::new(seeded_config()).expect("Game creation failed");
    let moves = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&moves);
    game.on_position_changed(move |pos| sink.lock().unwrap().push(pos));
    game.set_agent(AgentKind::Smart);

    game.advance(ms(300));
    assert_eq!(moves.lock().unwrap().len(), 2);

    // Two manual inputs one second apart: resume counts from the last one
    game.apply_manual_move(Direction::West);
    game.advance(ms(1000));
    game.apply_manual_move(Direction::North);
    let frozen = moves.lock().unwrap().len();

    game.advance(ms(1999));
    assert_eq!(game.scheduler_state(), SchedulerState::ManualOverride);
    assert_eq!(moves.lock().unwrap().len(), frozen, "agent must not move during override");

    game.advance(ms(1));
    assert_eq!(game.scheduler_state(), SchedulerState::Autonomous);
    game.advance(ms(150));
    assert_eq!(moves.lock().unwrap().len(), frozen + 1);

    println!("✅ Manual override timeline test passed!");
}

#[test]
fn test_switching_agents_keeps_one_timer() {
    println!("🧪 Testing agent switching...");

    let mut game = Game::new(seeded_config()).expect("Game creation failed");
    for kind in [AgentKind::Random, AgentKind::Smart, AgentKind::Smart, AgentKind::Random] {
        game.set_agent(kind);
        assert_eq!(game.agent_kind(), kind);
        assert_eq!(game.timers().len(), 1);
    }

    game.set_agent(AgentKind::None);
    assert_eq!(game.scheduler_state(), SchedulerState::Idle);
    assert!(game.timers().is_empty());
    assert_eq!(game.next_deadline(), None);

    println!("✅ Agent switching test passed!");
}

#[test]
fn test_resize_rejects_and_accepts() {
    println!("🧪 Testing maze resize...");

    let mut game = Game::new(seeded_config()).expect("Game creation failed");
    assert!(game.resize_maze(0, 10).is_err());
    assert!(game.resize_maze(10, maze_core::MAX_MAZE_DIMENSION + 1).is_err());
    assert_eq!(game.grid().rows(), 10);

    game.resize_maze(20, 30).expect("Resize should succeed");
    assert_eq!(game.goal(), Position::new(29, 19));
    assert!(game.grid().is_perfect());

    println!("✅ Maze resize test passed!");
}

#[test]
fn test_snapshot_json_restores() {
    println!("🧪 Testing snapshot JSON...");

    let mut game = Game::new(seeded_config()).expect("Game creation failed");
    game.set_agent(AgentKind::Smart);
    game.advance(ms(750));

    let json =
        serde_json::to_string_pretty(&game.snapshot()).expect("Snapshot serialization failed");
    let mut other = Game::new(GameConfig::default()).expect("Game creation failed");
    other
        .restore(serde_json::from_str(&json).expect("Snapshot parse failed"))
        .expect("Restore failed");

    assert_eq!(other.grid(), game.grid());
    assert_eq!(other.player_position(), game.player_position());

    // Both continue along the same shortest route
    game.advance(ms(150));
    other.advance(ms(150));
    assert_eq!(other.player_position(), game.player_position());

    println!("✅ Snapshot JSON test passed!");
}
