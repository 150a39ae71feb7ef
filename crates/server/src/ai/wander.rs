use crate::config::Config;
use crate::entity::Actor;
use rand::Rng;
use std::f32::consts::{PI, TAU};
use std::time::Duration;
use tokio::time::Instant;

/// Random-walk steering for enemies.
///
/// Every actor keeps its heading for `direction_change`, then picks a new
/// uniformly random one. Actors that leave the play area get their heading
/// flipped so they drift back in; this is containment, not collision response.
#[derive(Debug, Clone)]
pub struct Wander {
    /// Minimum time between random heading changes.
    pub direction_change: Duration,
    /// Half-extent of the play area on X and Z.
    pub half_extent: f32,
}

impl Wander {
    pub fn new(config: &Config) -> Self {
        Self {
            direction_change: config.actors.direction_change(),
            half_extent: config.world.half_extent,
        }
    }

    /// Advance one actor by `dt` seconds.
    pub fn update<R: Rng + ?Sized>(&self, actor: &mut Actor, now: Instant, dt: f32, rng: &mut R) {
        if now.saturating_duration_since(actor.last_turn) > self.direction_change {
            actor.heading = rng.random_range(0.0..TAU);
            actor.last_turn = now;
        }

        actor.position += actor.direction() * actor.speed * dt;

        // Only flip while still heading outward, otherwise an actor one step
        // past the edge would flip back and forth without re-entering.
        let dir = actor.direction();
        let escaping_x = actor.position.x.abs() > self.half_extent && dir.x * actor.position.x > 0.0;
        let escaping_z = actor.position.z.abs() > self.half_extent && dir.z * actor.position.z > 0.0;
        if escaping_x || escaping_z {
            actor.heading = (actor.heading + PI).rem_euclid(TAU);
        }
    }
}
