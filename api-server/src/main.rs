use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use std::time::Duration;

use host::{
    autosave, load_config, load_or_start, save_snapshot, spawn, DriverError, GameHandle, GameView,
};
use maze_core::{AgentKind, Direction, Game, GameConfig, GameSnapshot};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

const DEFAULT_AUTOSAVE_SECS: u64 = 30;

// Request/Response types

#[derive(Debug, Deserialize)]
struct MoveRequest {
    /// `up`/`down`/`left`/`right` or a compass name
    direction: String,
}

#[derive(Debug, Deserialize)]
struct AgentRequest {
    agent: AgentKind,
}

#[derive(Debug, Deserialize)]
struct SpeedRequest {
    speed_multiplier: f64,
}

#[derive(Debug, Deserialize)]
struct MemoryRequest {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ResizeRequest {
    rows: usize,
    cols: usize,
}

#[derive(Debug, Deserialize)]
struct RestoreRequest {
    snapshot: GameSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<GameView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<GameSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn state_response(result: Result<GameView, DriverError>) -> HttpResponse {
    match result {
        Ok(state) => HttpResponse::Ok().json(StateResponse {
            success: true,
            state: Some(state),
            error: None,
        }),
        Err(e) => error_response(&e),
    }
}

fn error_response(e: &DriverError) -> HttpResponse {
    let body = StateResponse {
        success: false,
        state: None,
        error: Some(e.to_string()),
    };
    match e {
        DriverError::Rejected(_) => HttpResponse::BadRequest().json(body),
        DriverError::Stopped => {
            tracing::error!("Game driver is not running");
            HttpResponse::ServiceUnavailable().json(body)
        }
    }
}

// API Handlers

/// GET /api/state
async fn get_state(game: web::Data<GameHandle>) -> impl Responder {
    state_response(game.view().await)
}

/// POST /api/move
/// Manual move, suspends an active agent
async fn manual_move(game: web::Data<GameHandle>, req: web::Json<MoveRequest>) -> impl Responder {
    let direction: Direction = match req.direction.parse() {
        Ok(direction) => direction,
        Err(e) => {
            return HttpResponse::BadRequest().json(StateResponse {
                success: false,
                state: None,
                error: Some(e),
            })
        }
    };
    tracing::debug!("Received move request: {}", req.direction);
    state_response(game.apply_manual_move(direction).await)
}

/// POST /api/agent
async fn set_agent(game: web::Data<GameHandle>, req: web::Json<AgentRequest>) -> impl Responder {
    tracing::info!("Received set-agent request: {}", req.agent);
    state_response(game.set_agent(req.agent).await)
}

/// POST /api/speed
async fn set_speed(game: web::Data<GameHandle>, req: web::Json<SpeedRequest>) -> impl Responder {
    tracing::info!("Received set-speed request: {}", req.speed_multiplier);
    state_response(game.set_speed_multiplier(req.speed_multiplier).await)
}

/// POST /api/memory
async fn set_memory(game: web::Data<GameHandle>, req: web::Json<MemoryRequest>) -> impl Responder {
    tracing::info!("Received set-memory request: {}", req.enabled);
    state_response(game.set_memory_enabled(req.enabled).await)
}

/// POST /api/resize
/// Regenerates the maze at the new size
async fn resize(game: web::Data<GameHandle>, req: web::Json<ResizeRequest>) -> impl Responder {
    tracing::info!("Received resize request: {}x{}", req.rows, req.cols);
    state_response(game.resize_maze(req.rows, req.cols).await)
}

/// GET /api/snapshot
async fn get_snapshot(game: web::Data<GameHandle>) -> impl Responder {
    match game.snapshot().await {
        Ok(snapshot) => HttpResponse::Ok().json(SnapshotResponse {
            success: true,
            snapshot: Some(snapshot),
            error: None,
        }),
        Err(e) => error_response(&e),
    }
}

/// POST /api/snapshot
/// Replace the running game with a saved one
async fn restore_snapshot(
    game: web::Data<GameHandle>,
    req: web::Json<RestoreRequest>,
) -> impl Responder {
    let RestoreRequest { snapshot } = req.into_inner();
    tracing::info!(
        "Received restore request for a {}x{} maze",
        snapshot.grid.rows(),
        snapshot.grid.cols()
    );
    state_response(game.restore(snapshot).await)
}

/// GET /health
/// Health check endpoint
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "idle-maze-api"
    }))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/api/state", web::get().to(get_state))
        .route("/api/move", web::post().to(manual_move))
        .route("/api/agent", web::post().to(set_agent))
        .route("/api/speed", web::post().to(set_speed))
        .route("/api/memory", web::post().to(set_memory))
        .route("/api/resize", web::post().to(resize))
        .route("/api/snapshot", web::get().to(get_snapshot))
        .route("/api/snapshot", web::post().to(restore_snapshot));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Idle Maze API Server");

    let config = match std::env::var("MAZE_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading game config from {}", path);
            load_config(&path).map_err(invalid_input)?
        }
        Err(_) => GameConfig::default(),
    };
    let snapshot_path = std::env::var("MAZE_SNAPSHOT").ok();
    let game = match snapshot_path.as_deref() {
        Some(path) => load_or_start(config, path).map_err(invalid_input)?,
        None => Game::new(config).map_err(invalid_input)?,
    };

    let shutdown = CancellationToken::new();
    let (handle, driver) = spawn(game, shutdown.clone());
    let saver = snapshot_path.clone().map(|path| {
        let every = autosave_interval();
        autosave(handle.clone(), path, every, shutdown.clone())
    });
    let handle = web::Data::new(handle);

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    tracing::info!("Binding to {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(["GET", "POST"])
                    .allow_any_header(),
            )
            .app_data(handle.clone())
            // 10MB limit, snapshots carry the grid
            .app_data(web::JsonConfig::default().limit(10_485_760))
            .configure(routes)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    tracing::info!("Server stopped, shutting down game driver");
    shutdown.cancel();
    if let Some(saver) = saver {
        if let Err(e) = saver.await {
            tracing::error!("Autosave task failed: {}", e);
        }
    }
    match driver.await {
        Ok(game) => {
            if let Some(path) = snapshot_path.as_deref() {
                match save_snapshot(&game.snapshot(), path) {
                    Ok(()) => tracing::info!("Saved game to {}", path),
                    Err(e) => tracing::error!("Final save to {} failed: {}", path, e),
                }
            }
        }
        Err(e) => tracing::error!("Game driver failed: {}", e),
    }
    Ok(())
}

fn invalid_input(e: impl ToString) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}

/// `MAZE_AUTOSAVE_SECS`, 30 seconds when unset or unreadable
fn autosave_interval() -> Duration {
    let secs = std::env::var("MAZE_AUTOSAVE_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_AUTOSAVE_SECS);
    Duration::from_secs(secs)
}
