//! Game entities.
//!
//! Plain data records owned by the `World`; systems refer to them by id.

mod boomerang;
mod coin;
mod food;
mod player;

pub use boomerang::{Boomerang, HitSet, Phase};
pub use coin::Coin;
pub use food::Food;
pub use player::{ControlledBy, InputFrame, LifeState, Player};

use glam::Vec2;

/// Anything with a circular footprint.
pub trait Body {
    fn position(&self) -> Vec2;
    fn radius(&self) -> f32;
}
