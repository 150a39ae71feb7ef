//! Battlezone authoritative game server library.

pub mod ai;
pub mod config;
pub mod entity;
pub mod server;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::{
    drive_session, run, serve, spawn_game, AdmissionSlot, Audience, ConnectionState, Frame,
    GameHandle, GameState, Outbound,
};
