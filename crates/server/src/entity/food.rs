//! Food pellet.

use super::Body;
use glam::Vec2;

/// A food pellet that grows whoever eats it.
#[derive(Debug, Clone)]
pub struct Food {
    pub id: u32,
    pub position: Vec2,
    pub mass: f32,
    radius: f32,
}

impl Food {
    /// Create a new food pellet.
    pub fn new(id: u32, position: Vec2, mass: f32) -> Self {
        Self {
            id,
            position,
            mass,
            radius: (mass.sqrt() * 0.55).max(0.5),
        }
    }

    /// Radius used for the eat check; pellets must be mostly covered.
    #[inline]
    pub fn eat_radius(&self) -> f32 {
        self.radius * 0.6
    }
}

impl Body for Food {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}
