//! Per-connection message pump, shared by every WebSocket front-end.

use super::game::GameState;
use super::Outbound;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use protocol::ProtocolError;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Transport-neutral view of an inbound WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary,
    Close,
    /// Ping/pong and other control traffic, answered by the transport.
    Control,
}

impl From<tokio_tungstenite::tungstenite::Message> for Frame {
    fn from(msg: tokio_tungstenite::tungstenite::Message) -> Self {
        use tokio_tungstenite::tungstenite::Message;
        match msg {
            Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            Message::Binary(_) => Frame::Binary,
            Message::Close(_) => Frame::Close,
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Frame::Control,
        }
    }
}

/// Run one client session to completion.
///
/// `outbound_rx` must be subscribed before this is called so the client
/// receives its own `gameStateUpdate`. The player is registered on entry and
/// removed on exit, however the connection ends. A client that falls behind
/// the broadcast channel is sent a fresh `gameStateUpdate` in place of the
/// messages it missed.
pub async fn drive_session<R, W, E>(
    mut read: R,
    mut write: W,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
    mut outbound_rx: broadcast::Receiver<Outbound>,
) where
    R: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
    W: Sink<String> + Unpin,
    W::Error: Display,
{
    let client_id = {
        let mut state = game_state.write().await;
        state.add_client(addr)
    };

    loop {
        tokio::select! {
            // Handle incoming WebSocket messages
            frame = read.next() => {
                match frame {
                    Some(Ok(Frame::Text(text))) => {
                        let mut state = game_state.write().await;
                        if let Err(e) = state.handle_frame(client_id, &text) {
                            warn!("Dropped message from {}: {}", addr, e);
                        }
                    }
                    Some(Ok(Frame::Binary)) => {
                        warn!("Dropped message from {}: {}", addr, ProtocolError::BinaryFrame);
                    }
                    Some(Ok(Frame::Close)) => {
                        info!("Client {} closed the connection", addr);
                        break;
                    }
                    Some(Ok(Frame::Control)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => {
                        break;
                    }
                }
            }
            // Handle broadcasts
            outbound = outbound_rx.recv() => {
                match outbound {
                    Ok(outbound) => {
                        if !outbound.audience.includes(client_id) {
                            continue;
                        }
                        if let Err(e) = write.send(outbound.frame.to_string()).await {
                            warn!("Failed to send {} to {}: {}", outbound.message.kind(), addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagging, skipped {} messages; resyncing", addr, skipped);
                        // Under the read lock nothing new can be broadcast, so
                        // the snapshot and the fresh receiver line up exactly.
                        let snapshot = {
                            let state = game_state.read().await;
                            outbound_rx = outbound_rx.resubscribe();
                            state.snapshot_frame()
                        };
                        match snapshot {
                            Ok(frame) => {
                                if let Err(e) = write.send(frame).await {
                                    warn!("Failed to resync {}: {}", addr, e);
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("Failed to encode resync snapshot for {}: {}", addr, e);
                                break;
                            }
                        }
                    }
                    Err(RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }

    // Remove client
    {
        let mut state = game_state.write().await;
        state.remove_client(client_id);
    }
}
