//! Player tank.

use glam::Vec3;
use protocol::{PlayerId, PlayerState};

/// A connected player's tank.
#[derive(Debug, Clone)]
pub struct Player {
    /// Session identifier (same as the owning connection).
    pub id: PlayerId,
    pub position: Vec3,
    /// Body rotation.
    pub rotation: Vec3,
    pub turret_rotation: Vec3,
    /// Remaining health, never below zero.
    pub health: i32,
    pub connected: bool,
}

impl Player {
    /// Create a player at `spawn` with full health.
    pub fn new(id: PlayerId, spawn: Vec3, health: i32) -> Self {
        Self {
            id,
            position: spawn,
            rotation: Vec3::ZERO,
            turret_rotation: Vec3::ZERO,
            health,
            connected: true,
        }
    }

    /// Whether the tank is currently in play (not waiting for a respawn).
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Replace the full transform.
    pub fn set_transform(&mut self, position: Vec3, rotation: Vec3, turret_rotation: Vec3) {
        self.position = position;
        self.rotation = rotation;
        self.turret_rotation = turret_rotation;
    }

    /// Subtract `damage`, clamping at zero. Returns `true` if this destroyed the tank.
    pub fn apply_damage(&mut self, damage: u32) -> bool {
        let remaining = i64::from(self.health) - i64::from(damage);
        self.health = remaining.max(0) as i32;
        self.health == 0
    }

    /// Bring the tank back at `position` with `health`.
    pub fn respawn(&mut self, position: Vec3, health: i32) {
        self.position = position;
        self.health = health;
    }

    /// Wire representation.
    pub fn state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            position: self.position.into(),
            rotation: self.rotation.into(),
            turret_rotation: self.turret_rotation.into(),
            health: self.health,
            connected: self.connected,
        }
    }
}
