//! Client -> Server message decoding.

use crate::{HitReport, ProtocolError, Vec3};
use serde::{Deserialize, Serialize};

/// Parsed client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Full replacement of the sender's transform.
    PlayerUpdate {
        position: Vec3,
        rotation: Vec3,
        turret_rotation: Vec3,
    },
    /// The sender fired a projectile.
    BulletFired { position: Vec3, velocity: Vec3 },
    /// The sender claims one of the projectiles hit a player.
    BulletHit(HitReport),
    /// Chat line.
    ChatMessage { message: String },
}

impl ClientMessage {
    /// Decode a client message from a text frame.
    ///
    /// Missing fields, unknown kinds and out-of-range values (for instance
    /// negative damage) are all reported as [`ProtocolError::Malformed`].
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::PlayerUpdate { .. } => "playerUpdate",
            ClientMessage::BulletFired { .. } => "bulletFired",
            ClientMessage::BulletHit(_) => "bulletHit",
            ClientMessage::ChatMessage { .. } => "chatMessage",
        }
    }

    /// Encode for sending (used by test clients and tooling).
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode {
            kind: self.kind(),
            source,
        })
    }
}
