//! Shared protocol crate for the Battlezone server.
//!
//! This crate contains:
//! - Message envelopes for both directions (JSON over WebSocket text frames)
//! - Shared wire types (Vec3, entity ids, entity states)
//! - The protocol error type

mod error;
pub mod messages;

pub use error::ProtocolError;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A 3D vector as it appears on the wire (`{ "x": .., "y": .., "z": .. }`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<glam::Vec3> for Vec3 {
    fn from(v: glam::Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for glam::Vec3 {
    fn from(v: Vec3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

/// Session identifier of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Allocate a fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a single fired projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectileId(pub Uuid);

impl ProjectileId {
    /// Allocate a fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Full player state, used for `playerJoined`, `playerRespawned` and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    pub position: Vec3,
    pub rotation: Vec3,
    pub turret_rotation: Vec3,
    pub health: i32,
    pub connected: bool,
}

/// A projectile as announced by `bulletSpawned`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileState {
    pub id: ProjectileId,
    pub player_id: PlayerId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Spawn time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// A server-driven enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyState {
    pub id: u32,
    pub position: Vec3,
    /// Movement heading in radians on the XZ plane.
    pub heading: f32,
    /// Units per second.
    pub speed: f32,
}

/// Hit report payload. Sent by clients and echoed back as `bulletHitConfirmed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitReport {
    pub bullet_id: ProjectileId,
    pub target_player_id: PlayerId,
    pub damage: u32,
}

/// Everything a freshly connected client needs to draw the world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub players: Vec<PlayerState>,
    pub enemies: Vec<EnemyState>,
    pub bullets: Vec<ProjectileState>,
}
