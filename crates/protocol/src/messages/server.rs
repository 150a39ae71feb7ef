//! Server -> Client message encoding.

use crate::{
    EnemyState, GameSnapshot, HitReport, PlayerId, PlayerState, ProjectileId, ProjectileState,
    ProtocolError, Vec3,
};
use serde::{Deserialize, Serialize};

/// Message sent from the server to one or more clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Full snapshot, sent once to a newly connected client.
    GameStateUpdate(GameSnapshot),
    /// Another player connected.
    PlayerJoined(PlayerState),
    /// Another player's transform changed.
    PlayerMoved {
        id: PlayerId,
        position: Vec3,
        rotation: Vec3,
        turret_rotation: Vec3,
    },
    /// A projectile was fired (echoed to the shooter as well).
    BulletSpawned(ProjectileState),
    /// A projectile left the world, by hit or by expiry.
    BulletDestroyed { id: ProjectileId },
    /// A non-lethal hit was applied.
    BulletHitConfirmed(HitReport),
    /// A player's health reached zero.
    PlayerDestroyed { id: PlayerId },
    /// A destroyed player is back with full health.
    PlayerRespawned(PlayerState),
    /// Chat line attributed to a player.
    ChatMessage {
        player_id: PlayerId,
        message: String,
        /// Server time in milliseconds since the Unix epoch.
        timestamp: u64,
    },
    /// A player disconnected.
    PlayerLeft { id: PlayerId },
    /// Bulk enemy positions, sent every tick while enemies exist.
    EnemiesUpdate { enemies: Vec<EnemyState> },
}

impl ServerMessage {
    /// Wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::GameStateUpdate(_) => "gameStateUpdate",
            ServerMessage::PlayerJoined(_) => "playerJoined",
            ServerMessage::PlayerMoved { .. } => "playerMoved",
            ServerMessage::BulletSpawned(_) => "bulletSpawned",
            ServerMessage::BulletDestroyed { .. } => "bulletDestroyed",
            ServerMessage::BulletHitConfirmed(_) => "bulletHitConfirmed",
            ServerMessage::PlayerDestroyed { .. } => "playerDestroyed",
            ServerMessage::PlayerRespawned(_) => "playerRespawned",
            ServerMessage::ChatMessage { .. } => "chatMessage",
            ServerMessage::PlayerLeft { .. } => "playerLeft",
            ServerMessage::EnemiesUpdate { .. } => "enemiesUpdate",
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode {
            kind: self.kind(),
            source,
        })
    }

    /// Decode a server message (used by test clients and tooling).
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
