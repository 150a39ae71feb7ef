//! Game server implementation.

use crate::config::Config;
use futures_util::{future, SinkExt, StreamExt};
use protocol::messages::ServerMessage;
use protocol::PlayerId;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::{accept_async, tungstenite};
use tracing::{error, info, warn};

pub mod client;
pub mod game;
pub mod session;
pub mod timers;

pub use game::{run_game_loop, GameState};
pub use session::{drive_session, Frame};

/// Which connections an outbound message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connection.
    All,
    /// Every connection except the one that caused the event.
    AllExcept(PlayerId),
    /// A single connection.
    Only(PlayerId),
}

impl Audience {
    pub fn includes(&self, id: PlayerId) -> bool {
        match *self {
            Audience::All => true,
            Audience::AllExcept(excluded) => excluded != id,
            Audience::Only(target) => target == id,
        }
    }
}

/// A message queued for delivery, already encoded once for all receivers.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub message: Arc<ServerMessage>,
    /// JSON text frame for `message`.
    pub frame: Arc<str>,
}

/// Connection tracking state (shared across connection handlers).
#[derive(Debug, Default)]
pub struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to add a connection, returns true if allowed.
    pub fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        // Check total connections
        if self.total_connections >= max_total {
            return false;
        }

        // Check per-IP limit
        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    pub fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total_connections
    }
}

/// A reserved admission slot, given back to the [`ConnectionState`] when
/// dropped. Moving it into a connection's task releases the slot however the
/// connection ends, including a failed WebSocket upgrade.
pub struct AdmissionSlot {
    conn_state: Arc<RwLock<ConnectionState>>,
    ip: IpAddr,
}

impl AdmissionSlot {
    /// Reserve a slot for `ip`, or `None` if a limit is reached.
    pub async fn acquire(
        conn_state: &Arc<RwLock<ConnectionState>>,
        ip: IpAddr,
        max_total: usize,
        max_per_ip: usize,
    ) -> Option<Self> {
        let admitted = conn_state
            .write()
            .await
            .try_add_connection(ip, max_total, max_per_ip);
        admitted.then(|| Self {
            conn_state: Arc::clone(conn_state),
            ip,
        })
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        if let Ok(mut conn_state) = self.conn_state.try_write() {
            conn_state.remove_connection(self.ip);
            return;
        }
        // Contended: release from a task once the lock is free.
        let conn_state = Arc::clone(&self.conn_state);
        let ip = self.ip;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    conn_state.write().await.remove_connection(ip);
                });
            }
            Err(_) => warn!("Admission slot for {} dropped outside the runtime", ip),
        }
    }
}

/// Shared handles to a running game.
#[derive(Clone)]
pub struct GameHandle {
    pub state: Arc<RwLock<GameState>>,
    pub outbound_tx: broadcast::Sender<Outbound>,
}

impl GameHandle {
    /// Subscribe a new connection to outbound messages.
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.outbound_tx.subscribe()
    }
}

/// Create the game state and start its loop on the current runtime.
pub fn spawn_game(config: &Config) -> GameHandle {
    let (outbound_tx, _outbound_rx) =
        broadcast::channel::<Outbound>(config.server.broadcast_capacity.max(1));
    let state = Arc::new(RwLock::new(GameState::new(config, outbound_tx.clone())));

    let game_loop_state = Arc::clone(&state);
    let tick_interval = config.server.tick_interval();
    tokio::spawn(async move {
        run_game_loop(game_loop_state, tick_interval).await;
    });

    GameHandle { state, outbound_tx }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);
    serve(listener, config).await
}

/// Accept WebSocket clients on an already bound listener.
pub async fn serve(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    let game = spawn_game(&config);

    // Connection tracking state
    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));

    // Connection limits
    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;

    loop {
        let (stream, addr) = listener.accept().await?;

        let Some(slot) =
            AdmissionSlot::acquire(&conn_state, addr.ip(), max_connections, ip_limit).await
        else {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        };

        let game = game.clone();
        let outbound_rx = game.subscribe();

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, game.state, outbound_rx).await;

            // Always remove from connection tracking when done
            drop(slot);

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
    outbound_rx: broadcast::Receiver<Outbound>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (write, read) = ws_stream.split();
    let read = read.map(|msg| msg.map(Frame::from));
    let write = write.with(|text: String| {
        future::ready(Ok::<_, tungstenite::Error>(tungstenite::Message::text(text)))
    });

    drive_session(read, Box::pin(write), addr, game_state, outbound_rx).await;
    Ok(())
}
