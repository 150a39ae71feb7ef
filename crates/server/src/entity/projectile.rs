//! Fired projectiles.

use glam::Vec3;
use protocol::{PlayerId, ProjectileId, ProjectileState};
use std::time::Duration;
use tokio::time::Instant;

/// A projectile in flight. The server never integrates its motion; position
/// and velocity are the values reported by the shooter at spawn time.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    /// Player that fired it.
    pub owner: PlayerId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Monotonic spawn time, used for expiry.
    pub created_at: Instant,
    /// Spawn time in Unix milliseconds, as sent to clients.
    pub timestamp: u64,
}

impl Projectile {
    pub fn new(owner: PlayerId, position: Vec3, velocity: Vec3, created_at: Instant, timestamp: u64) -> Self {
        Self {
            id: ProjectileId::new_v4(),
            owner,
            position,
            velocity,
            created_at,
            timestamp,
        }
    }

    /// Whether the projectile has lived for at least `ttl` at `now`.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    pub fn state(&self) -> ProjectileState {
        ProjectileState {
            id: self.id,
            player_id: self.owner,
            position: self.position.into(),
            velocity: self.velocity.into(),
            timestamp: self.timestamp,
        }
    }
}
