use std::time::Duration;

use host::{autosave, load_or_start, load_snapshot, save_snapshot, spawn, DriverError, GameEvent};
use maze_core::{AgentKind, Direction, Game, GameConfig, MazeError, Position, SchedulerState};
use tokio_util::sync::CancellationToken;

const MAZE_SEED: u64 = 2918957128;

fn temp_path(name: &str) -> String {
    let path = std::env::temp_dir().join(format!("maze_{}_{}.json", name, std::process::id()));
    path.to_str().expect("Temp path should be UTF-8").to_string()
}

fn seeded_game() -> Game {
    Game::new(GameConfig {
        seed: Some(MAZE_SEED),
        ..GameConfig::default()
    })
    .expect("Game creation failed")
}

#[tokio::test(start_paused = true)]
async fn test_smart_agent_moves_in_real_time() {
    println!("🧪 Testing driver tick timing...");

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(seeded_game(), shutdown.clone());
    let mut events = handle.subscribe();

    handle.set_agent(AgentKind::Smart).await.expect("Set agent failed");
    tokio::time::sleep(Duration::from_millis(149)).await;
    assert_eq!(handle.view().await.unwrap().player, Position::ORIGIN);

    tokio::time::sleep(Duration::from_millis(1)).await;
    let event = events.recv().await.expect("Position event expected");
    assert!(matches!(event, GameEvent::PositionChanged { .. }));

    let view = handle.view().await.unwrap();
    assert_ne!(view.player, Position::ORIGIN);
    assert_eq!(view.state, SchedulerState::Autonomous);
    assert!(!view.path.is_empty());

    shutdown.cancel();
    let game = driver.await.expect("Driver panicked");
    assert_eq!(game.player_position(), view.player);

    println!("✅ Driver tick timing test passed!");
}

#[tokio::test(start_paused = true)]
async fn test_goal_events_are_published() {
    println!("🧪 Testing goal events...");

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(seeded_game(), shutdown.clone());
    let mut events = handle.subscribe();
    handle.set_agent(AgentKind::Smart).await.unwrap();

    // A 10x10 route takes at most 99 ticks of 150ms
    let goal = tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            if let Ok(GameEvent::GoalReached) = events.recv().await {
                break;
            }
        }
    })
    .await;
    assert!(goal.is_ok(), "smart agent should reach the goal within 20s");

    let view = handle.view().await.unwrap();
    assert_eq!(view.completions, 1);
    assert_eq!(view.agent, AgentKind::Smart);

    shutdown.cancel();
    driver.await.unwrap();

    println!("✅ Goal events test passed!");
}

#[tokio::test(start_paused = true)]
async fn test_manual_override_through_handle() {
    println!("🧪 Testing manual override through the handle...");

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(seeded_game(), shutdown.clone());
    handle.set_agent(AgentKind::Random).await.unwrap();

    let view = handle.apply_manual_move(Direction::North).await.unwrap();
    assert_eq!(view.state, SchedulerState::ManualOverride);
    assert_eq!(view.player, Position::ORIGIN, "north of the start is the boundary wall");
    assert!(view.grid.is_none(), "move replies should leave the grid out");

    tokio::time::sleep(Duration::from_millis(1999)).await;
    assert_eq!(handle.view().await.unwrap().player, Position::ORIGIN);

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(handle.view().await.unwrap().state, SchedulerState::Autonomous);

    shutdown.cancel();
    driver.await.unwrap();

    println!("✅ Manual override test passed!");
}

#[tokio::test(start_paused = true)]
async fn test_rejected_commands_change_nothing() {
    println!("🧪 Testing rejected commands...");

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(seeded_game(), shutdown.clone());
    let before = handle.view().await.unwrap();

    let err = handle.resize_maze(0, 5).await.unwrap_err();
    assert!(matches!(
        err,
        DriverError::Rejected(MazeError::InvalidDimensions { rows: 0, cols: 5 })
    ));
    assert!(handle.set_speed_multiplier(f64::NAN).await.is_err());

    let after = handle.view().await.unwrap();
    assert!(after.grid.is_some());
    assert_eq!(after.grid, before.grid);
    assert_eq!(after.speed_multiplier, 1.0);

    let resized = handle.resize_maze(5, 7).await.expect("Resize failed");
    assert_eq!((resized.rows, resized.cols), (5, 7));
    assert!(resized.grid.is_some(), "resize replies carry the new grid");
    assert_eq!(resized.goal, Position::new(6, 4));

    shutdown.cancel();
    driver.await.unwrap();

    println!("✅ Rejected commands test passed!");
}

#[tokio::test(start_paused = true)]
async fn test_handle_reports_stopped_driver() {
    println!("🧪 Testing stopped driver...");

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(seeded_game(), shutdown.clone());
    shutdown.cancel();
    driver.await.unwrap();

    assert!(matches!(handle.view().await, Err(DriverError::Stopped)));

    println!("✅ Stopped driver test passed!");
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_file_round_trip() {
    println!("🧪 Testing snapshot files...");

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(seeded_game(), shutdown.clone());
    handle.set_memory_enabled(true).await.unwrap();
    handle.set_agent(AgentKind::Random).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let snapshot = handle.snapshot().await.unwrap();
    let path = temp_path("round_trip");
    let path = path.as_str();
    save_snapshot(&snapshot, path).expect("Save failed");
    let loaded = load_snapshot(path).expect("Load failed");
    let _ = std::fs::remove_file(path);
    assert_eq!(loaded, snapshot);

    // Restore into a fresh game through another driver
    let fresh = Game::new(GameConfig::default()).unwrap();
    let (other, other_driver) = spawn(fresh, shutdown.clone());
    let view = other.restore(loaded).await.expect("Restore failed");
    assert_eq!(view.grid.as_ref(), Some(&snapshot.grid));
    assert_eq!(view.player, snapshot.player);
    assert_eq!(view.agent, AgentKind::Random);
    assert!(view.memory_enabled);

    shutdown.cancel();
    driver.await.unwrap();
    other_driver.await.unwrap();

    println!("✅ Snapshot file test passed!");
}

#[tokio::test(start_paused = true)]
async fn test_autosave_writes_after_each_interval() {
    println!("🧪 Testing periodic autosave...");

    let path = temp_path("autosave");
    let _ = std::fs::remove_file(&path);

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(seeded_game(), shutdown.clone());
    handle.set_agent(AgentKind::Smart).await.unwrap();
    let saver = autosave(handle.clone(), path.clone(), Duration::from_secs(30), shutdown.clone());

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(!std::path::Path::new(&path).exists(), "nothing is saved before the first interval");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let first = load_snapshot(&path).expect("Autosave should exist after 30s");
    assert!(first.completions >= 1, "the smart agent finishes a 10x10 maze within 30s");

    // The next save reflects the game as it moved on
    tokio::time::sleep(Duration::from_secs(30)).await;
    let second = load_snapshot(&path).expect("Second autosave failed");
    assert!(second.completions > first.completions);

    shutdown.cancel();
    saver.await.expect("Autosave task panicked");
    driver.await.unwrap();
    let _ = std::fs::remove_file(&path);

    println!("✅ Autosave test passed!");
}

#[test]
fn test_boot_resumes_saved_game() {
    println!("🧪 Testing load on boot...");

    let path = temp_path("boot");
    let _ = std::fs::remove_file(&path);

    let config = GameConfig {
        seed: Some(MAZE_SEED),
        ..GameConfig::default()
    };
    let fresh = load_or_start(config.clone(), &path).expect("Missing save should start fresh");
    assert_eq!(fresh.agent_kind(), AgentKind::None);

    let mut played = seeded_game();
    played.set_agent(AgentKind::Random);
    played.advance(Duration::from_secs(3));
    save_snapshot(&played.snapshot(), &path).expect("Save failed");

    let resumed = load_or_start(config.clone(), &path).expect("Resume failed");
    assert_eq!(resumed.grid(), played.grid());
    assert_eq!(resumed.player_position(), played.player_position());
    assert_eq!(resumed.agent_kind(), AgentKind::Random);

    // A damaged save is reported instead of being replaced
    std::fs::write(&path, "{ not json").unwrap();
    assert!(load_or_start(config, &path).is_err());
    let _ = std::fs::remove_file(&path);

    println!("✅ Load on boot test passed!");
}
