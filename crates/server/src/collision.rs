//! Circle overlap tests and the mass-derived body formulas.

use crate::config::PlayerConfig;
use glam::Vec2;

/// Smallest radius a body can have regardless of mass.
pub const MIN_RADIUS: f32 = 2.2;
/// Radius per square root of mass.
pub const RADIUS_PER_ROOT_MASS: f32 = 1.15;

/// Result of checking two circles against each other.
#[derive(Debug, Clone, Copy)]
pub struct CollisionResult {
    /// Combined radius of both circles.
    pub r: f32,
    /// Distance between centers.
    pub d: f32,
}

impl CollisionResult {
    /// Touching counts as overlapping.
    #[inline]
    pub fn is_touching(&self) -> bool {
        self.d <= self.r
    }
}

/// Check two circles given by center and radius.
#[inline]
pub fn check_circles(a: Vec2, ra: f32, b: Vec2, rb: f32) -> CollisionResult {
    CollisionResult {
        r: ra + rb,
        d: a.distance(b),
    }
}

/// Radius as a pure function of mass.
#[inline]
pub fn mass_to_radius(mass: f32) -> f32 {
    (mass.max(0.0).sqrt() * RADIUS_PER_ROOT_MASS).max(MIN_RADIUS)
}

/// Movement speed for a body of `mass`: heavier is slower, clamped to the configured band.
#[inline]
pub fn speed_from_mass(mass: f32, player: &PlayerConfig) -> f32 {
    if !player.mass_slows {
        return player.speed_max;
    }
    let drag = mass.max(0.0).sqrt() * player.speed_mass_drag;
    (player.speed_base - drag).clamp(player.speed_min, player.speed_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_radius() {
        assert!((mass_to_radius(80.0) - 80f32.sqrt() * 1.15).abs() < 1e-5);
        assert_eq!(mass_to_radius(0.0), MIN_RADIUS);
    }

    #[test]
    fn test_speed_band() {
        let cfg = PlayerConfig::default();
        let light = speed_from_mass(80.0, &cfg);
        let heavy = speed_from_mass(1600.0, &cfg);
        assert!(light > heavy);
        assert!((light - (110.0 - 80f32.sqrt() * 2.5)).abs() < 1e-4);
        // 110 - 40 * 2.5 = 10, floored to the minimum.
        assert_eq!(heavy, 22.0);
    }

    #[test]
    fn test_circle_contact() {
        let hit = check_circles(Vec2::ZERO, 10.0, Vec2::new(13.0, 0.0), 3.0);
        assert!(hit.is_touching());
        assert_eq!(hit.d, 13.0);
        let miss = check_circles(Vec2::ZERO, 10.0, Vec2::new(13.1, 0.0), 3.0);
        assert!(!miss.is_touching());
    }
}
