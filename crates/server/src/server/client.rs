//! Client session state.

use protocol::PlayerId;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;

/// A connected client session. One session owns exactly one player.
#[derive(Debug)]
pub struct Client {
    /// Unique session id, also the id of the client's player.
    pub id: PlayerId,
    /// Remote address.
    pub addr: SocketAddr,
    /// When the connection was accepted.
    pub connected_at: Instant,
    /// Last activity timestamp.
    pub last_activity: Instant,
    /// Number of frames received (including dropped ones).
    pub frames_received: u64,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: PlayerId, addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            connected_at: now,
            last_activity: now,
            frames_received: 0,
        }
    }

    /// Record inbound activity.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.frames_received += 1;
    }

    /// Time since the last inbound frame (or since connecting).
    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }
}
