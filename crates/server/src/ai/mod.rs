//! Enemy AI.

mod wander;

pub use wander::Wander;
