//! Dropped coin.

use super::Body;
use glam::Vec2;

/// Coins are dropped where a player dies and hold that player's coins.
#[derive(Debug, Clone)]
pub struct Coin {
    pub id: u32,
    pub position: Vec2,
    pub value: u32,
    /// Simulation time of the drop, used for expiry.
    pub spawned_at: f64,
}

impl Coin {
    pub fn new(id: u32, position: Vec2, value: u32, now: f64) -> Self {
        Self {
            id,
            position,
            value,
            spawned_at: now,
        }
    }

    #[inline]
    pub fn is_expired(&self, now: f64, lifetime_ms: f64) -> bool {
        now - self.spawned_at >= lifetime_ms
    }
}

impl Body for Coin {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        0.0
    }
}
