//! World state management.
//!
//! The entity store: every player, projectile and enemy lives here and
//! nowhere else. Collaborators only ever see the wire states built from it.

use crate::entity::{Actor, Player, Projectile};
use glam::Vec3;
use protocol::{EnemyState, GameSnapshot, PlayerId, ProjectileId};
use rand::Rng;
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::time::Duration;
use tokio::time::Instant;

/// The game world containing all entities.
#[derive(Debug)]
pub struct World {
    /// Players by session id.
    pub players: HashMap<PlayerId, Player>,
    /// Live projectiles by id.
    pub projectiles: HashMap<ProjectileId, Projectile>,
    /// Enemies, in id order.
    pub actors: Vec<Actor>,
    /// Half-extent of the square play area on X and Z.
    pub half_extent: f32,
    /// Spawn height for players.
    pub spawn_height: f32,
}

impl World {
    /// Create an empty world.
    pub fn new(half_extent: f32, spawn_height: f32) -> Self {
        Self {
            players: HashMap::new(),
            projectiles: HashMap::new(),
            actors: Vec::new(),
            half_extent,
            spawn_height,
        }
    }

    /// Where new players appear.
    pub fn spawn_position(&self) -> Vec3 {
        Vec3::new(0.0, self.spawn_height, 0.0)
    }

    /// Random respawn point, spread over the central half of the play area.
    pub fn random_respawn_position(&self) -> Vec3 {
        let mut rng = rand::rng();
        let spread = self.half_extent / 2.0;
        Vec3::new(
            rng.random_range(-spread..=spread),
            self.spawn_height,
            rng.random_range(-spread..=spread),
        )
    }

    /// Insert a fresh player at the spawn point.
    pub fn add_player(&mut self, id: PlayerId, health: i32) -> &Player {
        let player = Player::new(id, self.spawn_position(), health);
        self.players.insert(id, player);
        &self.players[&id]
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn add_projectile(&mut self, projectile: Projectile) {
        self.projectiles.insert(projectile.id, projectile);
    }

    /// Remove a projectile. Removing an absent id is a no-op returning `None`.
    pub fn remove_projectile(&mut self, id: ProjectileId) -> Option<Projectile> {
        self.projectiles.remove(&id)
    }

    /// Remove every projectile that has lived for at least `ttl`, oldest first.
    pub fn remove_expired_projectiles(&mut self, now: Instant, ttl: Duration) -> Vec<Projectile> {
        let mut expired: Vec<ProjectileId> = self
            .projectiles
            .values()
            .filter(|p| p.is_expired(now, ttl))
            .map(|p| p.id)
            .collect();
        expired.sort_by_key(|id| self.projectiles[id].created_at);
        expired
            .into_iter()
            .filter_map(|id| self.projectiles.remove(&id))
            .collect()
    }

    /// Place `count` enemies at random positions inside the play area.
    pub fn spawn_actors(&mut self, count: usize, min_speed: f32, max_speed: f32, now: Instant) {
        let mut rng = rand::rng();
        let first_id = self.actors.len() as u32 + 1;
        for id in first_id..first_id + count as u32 {
            let position = Vec3::new(
                rng.random_range(-self.half_extent..=self.half_extent),
                0.0,
                rng.random_range(-self.half_extent..=self.half_extent),
            );
            let speed = if max_speed > min_speed {
                rng.random_range(min_speed..max_speed)
            } else {
                min_speed
            };
            let heading = rng.random_range(0.0..TAU);
            self.actors.push(Actor::new(id, position, heading, speed, now));
        }
    }

    pub fn enemy_states(&self) -> Vec<EnemyState> {
        self.actors.iter().map(Actor::state).collect()
    }

    /// Copy of the whole world for a newly connected client.
    pub fn snapshot(&self) -> GameSnapshot {
        let mut players: Vec<_> = self.players.values().map(Player::state).collect();
        players.sort_by_key(|p| p.id);
        let mut bullets: Vec<_> = self.projectiles.values().collect();
        bullets.sort_by_key(|p| p.created_at);
        GameSnapshot {
            players,
            enemies: self.enemy_states(),
            bullets: bullets.into_iter().map(Projectile::state).collect(),
        }
    }
}
