//! Game state and main loop.

use crate::ai::Wander;
use crate::config::Config;
use crate::entity::Projectile;
use crate::world::World;
use glam::Vec3;
use protocol::messages::{ClientMessage, ServerMessage};
use protocol::{HitReport, PlayerId, ProtocolError};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::client::Client;
use super::timers::{DeferredTask, TaskQueue};
use super::{Audience, Outbound};

/// Main game state.
///
/// Owns the connection registry and the entity store. Every mutation, from
/// inbound messages, deferred tasks or the tick, runs to completion while the
/// caller holds exclusive access.
pub struct GameState {
    pub config: Config,
    pub tick_count: u64,
    pub start_time: Instant,

    // Connected clients
    pub clients: HashMap<PlayerId, Client>,

    // Game world (entities)
    pub world: World,

    // Projectile expiry and respawns
    tasks: TaskQueue,

    // Enemy steering
    wander: Wander,

    // Outbound broadcast channel
    outbound_tx: broadcast::Sender<Outbound>,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,
}

impl GameState {
    /// Create a new game state and place the configured enemies.
    pub fn new(config: &Config, outbound_tx: broadcast::Sender<Outbound>) -> Self {
        let mut world = World::new(config.world.half_extent, config.world.spawn_height);
        let now = Instant::now();
        world.spawn_actors(
            config.actors.count,
            config.actors.min_speed,
            config.actors.max_speed,
            now,
        );

        Self {
            config: config.clone(),
            tick_count: 0,
            start_time: now,
            clients: HashMap::new(),
            world,
            tasks: TaskQueue::new(),
            wander: Wander::new(config),
            outbound_tx,
            update_time_avg: 0.0,
        }
    }

    /// Register a new connection and its player.
    ///
    /// The new client gets a full snapshot; everyone else gets `playerJoined`.
    pub fn add_client(&mut self, addr: SocketAddr) -> PlayerId {
        let id = PlayerId::new_v4();
        self.clients.insert(id, Client::new(id, addr));
        let joined = self.world.add_player(id, self.config.player.max_health).state();
        info!("Player {} connected from {}", id, addr);

        self.send(Audience::Only(id), ServerMessage::GameStateUpdate(self.world.snapshot()));
        self.send(Audience::AllExcept(id), ServerMessage::PlayerJoined(joined));
        id
    }

    /// Remove a connection and its player. Pending deferred tasks for the
    /// player are left alone and become no-ops.
    pub fn remove_client(&mut self, id: PlayerId) {
        if let Some(client) = self.clients.remove(&id) {
            info!(
                "Player {} ({}) disconnected after {:.1}s, {} frames, idle {:.1}s",
                id,
                client.addr,
                client.connected_at.elapsed().as_secs_f32(),
                client.frames_received,
                client.idle_time().as_secs_f32()
            );
            if self.world.remove_player(id).is_some() {
                self.send(Audience::AllExcept(id), ServerMessage::PlayerLeft { id });
            }
        }
    }

    /// Handle a text frame from a client.
    ///
    /// Frames from unknown sessions are ignored. Undecodable frames are
    /// returned as errors for the connection to log; nothing is mutated.
    pub fn handle_frame(&mut self, client_id: PlayerId, text: &str) -> Result<(), ProtocolError> {
        let Some(client) = self.clients.get_mut(&client_id) else {
            debug!("Frame from unknown client {}", client_id);
            return Ok(());
        };
        client.touch();

        let message = ClientMessage::decode(text)?;
        self.handle_message(client_id, message);
        Ok(())
    }

    /// Dispatch a decoded client message.
    pub fn handle_message(&mut self, client_id: PlayerId, message: ClientMessage) {
        if let ClientMessage::PlayerUpdate { .. } = message {
            // Movement updates are very frequent; avoid logging them
        } else {
            debug!("Player {} sent {:?}", client_id, message);
        }

        match message {
            ClientMessage::PlayerUpdate {
                position,
                rotation,
                turret_rotation,
            } => {
                self.handle_player_update(client_id, position.into(), rotation.into(), turret_rotation.into());
            }
            ClientMessage::BulletFired { position, velocity } => {
                self.handle_bullet_fired(client_id, position.into(), velocity.into());
            }
            ClientMessage::BulletHit(hit) => {
                self.handle_bullet_hit(client_id, hit);
            }
            ClientMessage::ChatMessage { message } => {
                self.handle_chat(client_id, message);
            }
        }
    }

    /// Replace the sender's transform and tell everyone else.
    fn handle_player_update(&mut self, client_id: PlayerId, position: Vec3, rotation: Vec3, turret_rotation: Vec3) {
        let Some(player) = self.world.player_mut(client_id) else {
            return;
        };
        player.set_transform(position, rotation, turret_rotation);

        self.send(
            Audience::AllExcept(client_id),
            ServerMessage::PlayerMoved {
                id: client_id,
                position: position.into(),
                rotation: rotation.into(),
                turret_rotation: turret_rotation.into(),
            },
        );
    }

    /// Spawn a projectile, echo it to everyone and schedule its expiry.
    fn handle_bullet_fired(&mut self, client_id: PlayerId, position: Vec3, velocity: Vec3) {
        if self.world.player(client_id).is_none() {
            return;
        }

        let now = Instant::now();
        let projectile = Projectile::new(client_id, position, velocity, now, unix_millis());
        let state = projectile.state();
        self.tasks.schedule(
            now + self.config.projectile.ttl(),
            DeferredTask::ExpireProjectile(projectile.id),
        );
        self.world.add_projectile(projectile);

        self.send(Audience::All, ServerMessage::BulletSpawned(state));
    }

    /// Apply a client-reported hit.
    ///
    /// Damage is taken at face value; the server does not re-check trajectory
    /// or distance. A report naming a projectile that is already gone is a
    /// no-op, which also stops one projectile from hitting twice.
    fn handle_bullet_hit(&mut self, client_id: PlayerId, hit: HitReport) {
        let Some(projectile) = self.world.remove_projectile(hit.bullet_id) else {
            debug!("Player {} reported hit by stale bullet {}", client_id, hit.bullet_id);
            return;
        };
        self.send(Audience::All, ServerMessage::BulletDestroyed { id: projectile.id });

        let target_id = hit.target_player_id;
        let Some(target) = self.world.player_mut(target_id) else {
            return;
        };
        if !target.is_alive() {
            // Already destroyed and waiting for its respawn.
            return;
        }

        if target.apply_damage(hit.damage) {
            info!("Player {} destroyed (hit reported by {})", target_id, client_id);
            self.send(Audience::All, ServerMessage::PlayerDestroyed { id: target_id });
            self.tasks.schedule(
                Instant::now() + self.config.player.respawn_delay(),
                DeferredTask::Respawn(target_id),
            );
        } else {
            self.send(Audience::All, ServerMessage::BulletHitConfirmed(hit));
        }
    }

    /// Broadcast a chat line to everyone, sender included.
    fn handle_chat(&mut self, client_id: PlayerId, message: String) {
        if self.world.player(client_id).is_none() {
            return;
        }
        info!("[CHAT] {}: {}", client_id, message);
        self.send(
            Audience::All,
            ServerMessage::ChatMessage {
                player_id: client_id,
                message,
                timestamp: unix_millis(),
            },
        );
    }

    /// Number of scheduled expiries and respawns not yet run.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Encode a full `gameStateUpdate` for a client that has to resync.
    pub fn snapshot_frame(&self) -> Result<String, ProtocolError> {
        ServerMessage::GameStateUpdate(self.world.snapshot()).encode()
    }

    /// Earliest deadline among pending deferred tasks.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.next_due()
    }

    /// Run every deferred task due at `now`.
    pub fn run_due_tasks(&mut self, now: Instant) {
        while let Some(task) = self.tasks.pop_due(now) {
            match task {
                DeferredTask::ExpireProjectile(id) => {
                    if self.world.remove_projectile(id).is_some() {
                        self.send(Audience::All, ServerMessage::BulletDestroyed { id });
                    }
                }
                DeferredTask::Respawn(id) => self.respawn_player(id),
            }
        }
    }

    fn respawn_player(&mut self, id: PlayerId) {
        let position = self.world.random_respawn_position();
        let health = self.config.player.max_health;
        let Some(player) = self.world.player_mut(id) else {
            return;
        };
        player.respawn(position, health);
        let state = player.state();
        info!("Player {} respawned at ({:.1}, {:.1})", id, position.x, position.z);
        self.send(Audience::All, ServerMessage::PlayerRespawned(state));
    }

    /// Drop projectiles that outlived their TTL even if their expiry task has
    /// not run yet. The store decides which path announces the removal.
    pub(crate) fn sweep_projectiles(&mut self, now: Instant) {
        let ttl = self.config.projectile.ttl();
        for projectile in self.world.remove_expired_projectiles(now, ttl) {
            self.send(Audience::All, ServerMessage::BulletDestroyed { id: projectile.id });
        }
    }

    /// Run a single game tick.
    pub fn tick(&mut self) {
        self.tick_count += 1;
        let now = Instant::now();

        self.run_due_tasks(now);

        let dt = self.config.server.tick_interval().as_secs_f32();
        let mut rng = rand::rng();
        for actor in &mut self.world.actors {
            self.wander.update(actor, now, dt, &mut rng);
        }

        self.sweep_projectiles(now);

        if !self.world.actors.is_empty() {
            let enemies = self.world.enemy_states();
            self.send(Audience::All, ServerMessage::EnemiesUpdate { enemies });
        }
    }

    /// Encode once and queue for every connection in `audience`.
    fn send(&self, audience: Audience, message: ServerMessage) {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Dropping outbound message: {}", e);
                return;
            }
        };
        // No receivers just means nobody is connected.
        let _ = self.outbound_tx.send(Outbound {
            audience,
            message: Arc::new(message),
            frame: frame.into(),
        });
    }
}

/// Milliseconds since the Unix epoch, for client-facing timestamps.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Wait until `deadline`, or forever if there is none.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Main game loop.
///
/// Ticks at a fixed interval and, between ticks, wakes up for the earliest
/// deferred task so expiries and respawns are not rounded up to the next tick.
pub async fn run_game_loop(state: Arc<RwLock<GameState>>, tick_interval: Duration) {
    let start = Instant::now() + tick_interval;
    let mut ticker = interval_at(start, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    {
        let game = state.read().await;
        info!(
            "Game loop started: {}ms ticks, {} enemies",
            tick_interval.as_millis(),
            game.world.actors.len()
        );
    }

    loop {
        let next_task = state.read().await.next_deadline();

        tokio::select! {
            _ = ticker.tick() => {
                let mut game = state.write().await;
                let tick_start = std::time::Instant::now();
                game.tick();
                let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

                game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

                let tick_budget = tick_interval.as_secs_f64() * 1000.0 * 0.9;
                if tick_ms > tick_budget {
                    warn!(
                        "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} bullets, {} enemies",
                        game.tick_count,
                        tick_ms,
                        tick_budget,
                        game.clients.len(),
                        game.world.projectiles.len(),
                        game.world.actors.len()
                    );
                }
            }
            _ = sleep_until_deadline(next_task) => {
                state.write().await.run_due_tasks(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{ProjectileId, Vec3 as WireVec3};

    fn setup(config: Config) -> (GameState, broadcast::Receiver<Outbound>) {
        let (tx, rx) = broadcast::channel(1024);
        (GameState::new(&config, tx), rx)
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<Outbound>) -> Vec<Outbound> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn kinds(outbound: &[Outbound]) -> Vec<&'static str> {
        outbound.iter().map(|o| o.message.kind()).collect()
    }

    fn fire(game: &mut GameState, rx: &mut broadcast::Receiver<Outbound>, shooter: PlayerId) -> ProjectileId {
        game.handle_message(
            shooter,
            ClientMessage::BulletFired {
                position: WireVec3::new(0.0, 1.0, 0.0),
                velocity: WireVec3::new(0.0, 0.0, 30.0),
            },
        );
        let sent = drain(rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].audience, Audience::All);
        match sent[0].message.as_ref() {
            ServerMessage::BulletSpawned(bullet) => {
                assert_eq!(bullet.player_id, shooter);
                bullet.id
            }
            other => panic!("expected bulletSpawned, got {:?}", other),
        }
    }

    fn hit(bullet_id: ProjectileId, target_player_id: PlayerId, damage: u32) -> ClientMessage {
        ClientMessage::BulletHit(HitReport {
            bullet_id,
            target_player_id,
            damage,
        })
    }

    fn destroyed_count(outbound: &[Outbound], bullet: ProjectileId) -> usize {
        outbound
            .iter()
            .filter(|o| matches!(o.message.as_ref(), ServerMessage::BulletDestroyed { id } if *id == bullet))
            .count()
    }

    #[tokio::test]
    async fn connect_sends_snapshot_and_announces_player() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        let sent = drain(&mut rx);
        assert_eq!(kinds(&sent), ["gameStateUpdate", "playerJoined"]);
        assert_eq!(sent[0].audience, Audience::Only(a));
        assert_eq!(sent[1].audience, Audience::AllExcept(a));

        let b = game.add_client(addr());
        let sent = drain(&mut rx);
        let ServerMessage::GameStateUpdate(snapshot) = sent[0].message.as_ref() else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.players.len(), 2);
        let joined = snapshot.players.iter().find(|p| p.id == b).unwrap();
        assert_eq!(joined.position, WireVec3::new(0.0, 0.5, 0.0));
        assert_eq!(joined.health, 100);
        assert!(joined.connected);
    }

    #[tokio::test]
    async fn player_count_tracks_connections() {
        let (mut game, mut rx) = setup(Config::default());
        let ids: Vec<_> = (0..5).map(|_| game.add_client(addr())).collect();
        assert_eq!(game.world.players.len(), game.clients.len());

        game.remove_client(ids[1]);
        game.remove_client(ids[3]);
        game.remove_client(ids[3]);
        assert_eq!(game.clients.len(), 3);
        assert_eq!(game.world.players.len(), 3);

        let left: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|o| o.message.kind() == "playerLeft")
            .collect();
        assert_eq!(left.len(), 2);
        assert_eq!(left[0].audience, Audience::AllExcept(ids[1]));
    }

    #[tokio::test]
    async fn movement_replaces_transform_and_is_idempotent() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        drain(&mut rx);

        let update = ClientMessage::PlayerUpdate {
            position: WireVec3::new(3.0, 0.5, -7.0),
            rotation: WireVec3::new(0.0, 1.0, 0.0),
            turret_rotation: WireVec3::new(0.0, 2.0, 0.0),
        };
        game.handle_message(a, update.clone());
        let after_first = game.world.player(a).unwrap().state();
        game.handle_message(a, update);
        assert_eq!(game.world.player(a).unwrap().state(), after_first);
        assert_eq!(after_first.position, WireVec3::new(3.0, 0.5, -7.0));
        assert_eq!(after_first.turret_rotation, WireVec3::new(0.0, 2.0, 0.0));

        let sent = drain(&mut rx);
        assert_eq!(kinds(&sent), ["playerMoved", "playerMoved"]);
        assert_eq!(sent[0].audience, Audience::AllExcept(a));
    }

    #[tokio::test(start_paused = true)]
    async fn unhit_bullet_is_destroyed_once_at_ttl() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        drain(&mut rx);
        let bullet = fire(&mut game, &mut rx, a);

        tokio::time::advance(Duration::from_millis(4999)).await;
        game.tick();
        assert!(drain(&mut rx).is_empty());
        assert!(game.world.projectiles.contains_key(&bullet));

        tokio::time::advance(Duration::from_millis(1)).await;
        game.run_due_tasks(Instant::now());
        game.tick();
        tokio::time::advance(Duration::from_secs(10)).await;
        game.tick();

        let sent = drain(&mut rx);
        assert_eq!(destroyed_count(&sent, bullet), 1);
        assert!(game.world.projectiles.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_before_expiry_task_does_not_double_destroy() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        drain(&mut rx);
        let bullet = fire(&mut game, &mut rx, a);

        tokio::time::advance(Duration::from_secs(6)).await;
        game.sweep_projectiles(Instant::now());
        game.run_due_tasks(Instant::now());

        assert_eq!(destroyed_count(&drain(&mut rx), bullet), 1);
        assert!(game.tasks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hit_removes_bullet_and_ttl_stays_quiet() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        let b = game.add_client(addr());
        drain(&mut rx);
        let bullet = fire(&mut game, &mut rx, a);

        game.handle_message(a, hit(bullet, b, 30));
        let sent = drain(&mut rx);
        assert_eq!(kinds(&sent), ["bulletDestroyed", "bulletHitConfirmed"]);
        assert_eq!(game.world.player(b).unwrap().health, 70);
        let ServerMessage::BulletHitConfirmed(report) = sent[1].message.as_ref() else {
            panic!("expected hit confirmation");
        };
        assert_eq!(report.damage, 30);
        assert_eq!(report.target_player_id, b);

        tokio::time::advance(Duration::from_secs(6)).await;
        game.tick();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn stale_bullet_hit_is_ignored() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        let b = game.add_client(addr());
        drain(&mut rx);
        let bullet = fire(&mut game, &mut rx, a);
        game.handle_message(a, hit(bullet, b, 10));
        drain(&mut rx);

        game.handle_message(a, hit(bullet, b, 10));
        game.handle_message(a, hit(ProjectileId::new_v4(), b, 10));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(game.world.player(b).unwrap().health, 90);
    }

    #[tokio::test]
    async fn hit_on_missing_target_still_consumes_bullet() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        drain(&mut rx);
        let bullet = fire(&mut game, &mut rx, a);

        game.handle_message(a, hit(bullet, PlayerId::new_v4(), 50));
        assert_eq!(kinds(&drain(&mut rx)), ["bulletDestroyed"]);
        assert!(game.world.projectiles.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn lethal_hit_destroys_then_respawns() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        let b = game.add_client(addr());
        drain(&mut rx);

        let first = fire(&mut game, &mut rx, b);
        let second = fire(&mut game, &mut rx, b);
        game.handle_message(b, hit(first, a, 150));
        assert_eq!(game.world.player(a).unwrap().health, 0);

        // A second report against the wreck does nothing beyond consuming the bullet.
        game.handle_message(b, hit(second, a, 150));
        let sent = drain(&mut rx);
        assert_eq!(kinds(&sent), ["bulletDestroyed", "playerDestroyed", "bulletDestroyed"]);
        assert!(matches!(sent[1].message.as_ref(), ServerMessage::PlayerDestroyed { id } if *id == a));

        tokio::time::advance(Duration::from_millis(2999)).await;
        game.run_due_tasks(Instant::now());
        assert!(drain(&mut rx).is_empty());

        tokio::time::advance(Duration::from_millis(1)).await;
        game.run_due_tasks(Instant::now());
        tokio::time::advance(Duration::from_secs(5)).await;
        game.run_due_tasks(Instant::now());

        let respawned: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|o| o.message.kind() == "playerRespawned")
            .collect();
        assert_eq!(respawned.len(), 1);
        let ServerMessage::PlayerRespawned(state) = respawned[0].message.as_ref() else {
            unreachable!();
        };
        assert_eq!(state.id, a);
        assert_eq!(state.health, 100);
        assert!((-40.0..=40.0).contains(&state.position.x));
        assert!((-40.0..=40.0).contains(&state.position.z));
        assert_eq!(state.position.y, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn respawn_after_disconnect_is_noop() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        let b = game.add_client(addr());
        drain(&mut rx);
        let bullet = fire(&mut game, &mut rx, b);
        game.handle_message(b, hit(bullet, a, 100));
        game.remove_client(a);
        drain(&mut rx);
        // The bullet's expiry and the respawn are both still scheduled.
        assert_eq!(game.pending_tasks(), 2);

        tokio::time::advance(Duration::from_secs(3)).await;
        game.run_due_tasks(Instant::now());
        assert!(drain(&mut rx).is_empty());
        assert!(game.world.player(a).is_none());
        assert_eq!(game.pending_tasks(), 1);
    }

    #[tokio::test]
    async fn chat_goes_to_everyone_with_sender() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        drain(&mut rx);

        game.handle_message(a, ClientMessage::ChatMessage { message: "hello".into() });
        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].audience, Audience::All);
        let ServerMessage::ChatMessage { player_id, message, timestamp } = sent[0].message.as_ref() else {
            panic!("expected chat");
        };
        assert_eq!(*player_id, a);
        assert_eq!(message, "hello");
        assert!(*timestamp > 0);
    }

    #[tokio::test]
    async fn malformed_frame_is_rejected_without_side_effects() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        drain(&mut rx);

        let result = game.handle_frame(a, r#"{"type":"bulletFired","data":{"position":{"x":1}}}"#);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
        assert!(game.world.projectiles.is_empty());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(game.clients[&a].frames_received, 1);

        game.handle_frame(a, r#"{"type":"chatMessage","data":{"message":"ok"}}"#)
            .unwrap();
        assert_eq!(kinds(&drain(&mut rx)), ["chatMessage"]);
    }

    #[tokio::test]
    async fn messages_from_departed_players_are_ignored() {
        let (mut game, mut rx) = setup(Config::default());
        let a = game.add_client(addr());
        game.remove_client(a);
        drain(&mut rx);

        game.handle_frame(a, r#"{"type":"chatMessage","data":{"message":"ghost"}}"#)
            .unwrap();
        game.handle_message(
            a,
            ClientMessage::BulletFired {
                position: WireVec3::ZERO,
                velocity: WireVec3::ZERO,
            },
        );
        assert!(drain(&mut rx).is_empty());
        assert!(game.world.projectiles.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_moves_enemies_and_broadcasts_them() {
        let mut config = Config::default();
        config.actors.count = 3;
        let (mut game, mut rx) = setup(config);
        let before: Vec<_> = game.world.actors.iter().map(|a| a.position).collect();

        tokio::time::advance(Duration::from_millis(100)).await;
        game.tick();

        let sent = drain(&mut rx);
        assert_eq!(kinds(&sent), ["enemiesUpdate"]);
        let ServerMessage::EnemiesUpdate { enemies } = sent[0].message.as_ref() else {
            unreachable!();
        };
        assert_eq!(enemies.len(), 3);
        for (actor, old) in game.world.actors.iter().zip(before) {
            let moved = actor.position.distance(old);
            assert!((moved - actor.speed * 0.1).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn no_enemy_broadcast_without_enemies() {
        let (mut game, mut rx) = setup(Config::default());
        game.tick();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn game_loop_expires_bullet_on_time() {
        let (tx, mut rx) = broadcast::channel(64);
        let state = Arc::new(RwLock::new(GameState::new(&Config::default(), tx)));
        let a = state.write().await.add_client(addr());
        drain(&mut rx);

        tokio::spawn(run_game_loop(Arc::clone(&state), Duration::from_millis(100)));
        let fired_at = Instant::now();
        state.write().await.handle_message(
            a,
            ClientMessage::BulletFired {
                position: WireVec3::ZERO,
                velocity: WireVec3::new(1.0, 0.0, 0.0),
            },
        );

        let spawned = rx.recv().await.unwrap();
        let ServerMessage::BulletSpawned(bullet) = spawned.message.as_ref() else {
            panic!("expected bulletSpawned");
        };
        let destroyed = rx.recv().await.unwrap();
        assert!(matches!(destroyed.message.as_ref(), ServerMessage::BulletDestroyed { id } if *id == bullet.id));
        let elapsed = fired_at.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "destroyed early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(5100), "destroyed late: {:?}", elapsed);
    }
}
