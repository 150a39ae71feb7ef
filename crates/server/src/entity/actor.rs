//! Server-driven enemies.

use glam::Vec3;
use protocol::EnemyState;
use tokio::time::Instant;

/// A wandering enemy. Steering lives in [`crate::ai::Wander`].
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: u32,
    pub position: Vec3,
    /// Heading in radians on the XZ plane (0 = +X, PI/2 = +Z).
    pub heading: f32,
    /// Units per second.
    pub speed: f32,
    /// When the heading was last randomized.
    pub last_turn: Instant,
}

impl Actor {
    pub fn new(id: u32, position: Vec3, heading: f32, speed: f32, now: Instant) -> Self {
        Self {
            id,
            position,
            heading,
            speed,
            last_turn: now,
        }
    }

    /// Unit direction of travel.
    pub fn direction(&self) -> Vec3 {
        Vec3::new(self.heading.cos(), 0.0, self.heading.sin())
    }

    pub fn state(&self) -> EnemyState {
        EnemyState {
            id: self.id,
            position: self.position.into(),
            heading: self.heading,
            speed: self.speed,
        }
    }
}
