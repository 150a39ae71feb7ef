//! Battlezone - game server and static client on one port.

use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{future, SinkExt, StreamExt};
use serde::Serialize;
use server::{AdmissionSlot, ConnectionState, Frame, GameHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    game: GameHandle,
    conn_state: Arc<RwLock<ConnectionState>>,
    max_connections: usize,
    ip_limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("Battlezone Server v{}", env!("CARGO_PKG_VERSION"));

    // Load server configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Name: {}", config.server.name);
    info!("  Port: {}", config.server.port);
    info!("  Static files: {}", config.server.static_dir);
    info!("  Play area: +/-{}", config.world.half_extent);
    info!("  Enemies: {}", config.actors.count);

    // Create shared game state and start the game loop
    let game = server::spawn_game(&config);

    let state = AppState {
        game,
        conn_state: Arc::new(RwLock::new(ConnectionState::new())),
        max_connections: config.server.max_connections,
        ip_limit: config.server.ip_limit,
    };

    let app = build_router(state, &config.server.static_dir);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

/// Build the axum router
fn build_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        // WebSocket game endpoint
        .route("/ws", get(websocket_handler))
        .route("/status", get(status_handler))
        // Static file serving (index.html, scripts, models)
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
        )
        .with_state(state)
}

/// Handle WebSocket connections for the game
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    let Some(slot) =
        AdmissionSlot::acquire(&state.conn_state, addr.ip(), state.max_connections, state.ip_limit)
            .await
    else {
        warn!("Connection rejected (limit reached): {}", addr);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    info!("WebSocket connection from {}", addr);
    // Subscribe before the upgrade so the snapshot sent on join is not missed
    let outbound_rx = state.game.subscribe();

    // The slot lives in the callback, which axum drops unrun if the upgrade fails
    ws.on_failed_upgrade(move |e| warn!("WebSocket upgrade from {} failed: {}", addr, e))
        .on_upgrade(move |socket| async move {
            handle_websocket(socket, addr, state.game, outbound_rx).await;
            drop(slot);
        })
}

/// Adapt an axum WebSocket to the server's session loop
async fn handle_websocket(
    socket: WebSocket,
    addr: SocketAddr,
    game: GameHandle,
    outbound_rx: tokio::sync::broadcast::Receiver<server::Outbound>,
) {
    let (write, read) = socket.split();
    let read = read.map(|msg| msg.map(frame_from_axum));
    let write = write.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text.into()))));

    server::drive_session(read, Box::pin(write), addr, game.state, outbound_rx).await;
}

fn frame_from_axum(msg: Message) -> Frame {
    match msg {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Binary(_) => Frame::Binary,
        Message::Close(_) => Frame::Close,
        Message::Ping(_) | Message::Pong(_) => Frame::Control,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerStatus {
    players: usize,
    bullets: usize,
    enemies: usize,
    connections: usize,
    tick: u64,
    pending_tasks: usize,
    uptime_secs: u64,
    update_time_avg_ms: f64,
}

/// Live server statistics as JSON
async fn status_handler(State(state): State<AppState>) -> Json<ServerStatus> {
    let connections = state.conn_state.read().await.total();
    let game = state.game.state.read().await;
    Json(ServerStatus {
        players: game.world.players.len(),
        bullets: game.world.projectiles.len(),
        enemies: game.world.actors.len(),
        connections,
        tick: game.tick_count,
        pending_tasks: game.pending_tasks(),
        uptime_secs: game.start_time.elapsed().as_secs(),
        update_time_avg_ms: game.update_time_avg,
    })
}
