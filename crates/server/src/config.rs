//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub projectile: ProjectileConfig,
    #[serde(default)]
    pub actors: ActorConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    ///
    /// A `PORT` environment variable overrides `server.port`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(Path::new("config.toml"))?;
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        Ok(config)
    }

    /// Load configuration from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Reject values the game loop and spawner cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.tick_interval_ms == 0 {
            anyhow::bail!("server.tick_interval_ms must be greater than 0");
        }
        if !(self.world.half_extent.is_finite() && self.world.half_extent > 0.0) {
            anyhow::bail!(
                "world.half_extent must be a positive number, got {}",
                self.world.half_extent
            );
        }
        if !(self.actors.min_speed.is_finite() && self.actors.max_speed.is_finite()) {
            anyhow::bail!("actors.min_speed and actors.max_speed must be finite");
        }
        Ok(())
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Capacity of the outbound broadcast channel. Slow clients that fall
    /// further behind than this lose the oldest messages.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    /// Directory served over HTTP by the unified binary.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Server name (logged at startup).
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            tick_interval_ms: default_tick_interval(),
            broadcast_capacity: default_broadcast_capacity(),
            static_dir: default_static_dir(),
            name: default_name(),
        }
    }
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    100
}
fn default_tick_interval() -> u64 {
    100
}
fn default_broadcast_capacity() -> usize {
    256
}
fn default_static_dir() -> String {
    "public".to_string()
}
fn default_name() -> String {
    "Battlezone".to_string()
}

/// Play area configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Half-extent of the square play area on both horizontal axes.
    #[serde(default = "default_half_extent")]
    pub half_extent: f32,
    /// Height at which players spawn and respawn.
    #[serde(default = "default_spawn_height")]
    pub spawn_height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            half_extent: default_half_extent(),
            spawn_height: default_spawn_height(),
        }
    }
}

fn default_half_extent() -> f32 {
    80.0
}
fn default_spawn_height() -> f32 {
    0.5
}

/// Player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_max_health")]
    pub max_health: i32,
    #[serde(default = "default_respawn_delay")]
    pub respawn_delay_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: default_max_health(),
            respawn_delay_ms: default_respawn_delay(),
        }
    }
}

impl PlayerConfig {
    pub fn respawn_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_delay_ms)
    }
}

fn default_max_health() -> i32 {
    100
}
fn default_respawn_delay() -> u64 {
    3000
}

/// Projectile configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectileConfig {
    #[serde(default = "default_projectile_ttl")]
    pub ttl_ms: u64,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_projectile_ttl(),
        }
    }
}

impl ProjectileConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

fn default_projectile_ttl() -> u64 {
    5000
}

/// Server-driven enemy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActorConfig {
    /// Number of enemies placed in the world at startup.
    #[serde(default)]
    pub count: usize,
    /// Minimum time between random heading changes.
    #[serde(default = "default_direction_change")]
    pub direction_change_ms: u64,
    /// Slowest enemy speed in units per second.
    #[serde(default = "default_actor_min_speed")]
    pub min_speed: f32,
    /// Fastest enemy speed in units per second.
    #[serde(default = "default_actor_max_speed")]
    pub max_speed: f32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            count: 0,
            direction_change_ms: default_direction_change(),
            min_speed: default_actor_min_speed(),
            max_speed: default_actor_max_speed(),
        }
    }
}

impl ActorConfig {
    pub fn direction_change(&self) -> Duration {
        Duration::from_millis(self.direction_change_ms)
    }
}

fn default_direction_change() -> u64 {
    2000
}
fn default_actor_min_speed() -> f32 {
    0.2
}
fn default_actor_max_speed() -> f32 {
    0.5
}
