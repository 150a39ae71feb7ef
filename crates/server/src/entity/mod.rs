//! Game entities.
//!
//! This module defines every entity kind held by the [`World`](crate::world::World).

mod actor;
mod player;
mod projectile;

pub use actor::Actor;
pub use player::Player;
pub use projectile::Projectile;
