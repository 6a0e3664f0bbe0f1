use super::GameMode;
use crate::collision::mass_to_radius;
use crate::config::Config;
use crate::world::{Containment, World};
use glam::Vec2;

/// Free-for-all: open rectangular world, food, decaying coins and respawning bots.
pub struct Ffa;

impl Ffa {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Ffa {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for Ffa {
    fn name(&self) -> &str {
        "FFA"
    }

    fn id(&self) -> u8 {
        0
    }

    fn containment(&self, _config: &Config) -> Containment {
        Containment::Rect
    }

    fn auto_aim(&self, config: &Config) -> bool {
        config.boomerang.auto_aim.unwrap_or(false)
    }

    fn crowd_separation(&self) -> bool {
        true
    }

    fn food_enabled(&self) -> bool {
        true
    }

    fn coin_lifetime_ms(&self, config: &Config) -> Option<f64> {
        Some(config.coins.lifetime_ms)
    }

    fn spawn_position(&self, world: &World, config: &Config) -> Vec2 {
        world
            .border
            .random_position(mass_to_radius(config.player.initial_mass))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffa_policy() {
        let mut config = Config::default();
        let mode = Ffa::new();
        assert!(!mode.auto_aim(&config));
        config.boomerang.auto_aim = Some(true);
        assert!(mode.auto_aim(&config));
        assert_eq!(mode.coin_lifetime_ms(&config), Some(8000.0));
        assert!(mode.removes_dead());
        assert!(mode.round_view(0.0).is_none());
    }

    #[test]
    fn test_spawn_inside_world() {
        let config = Config::default();
        let world = World::new(&config.world, Containment::Rect);
        let mode = Ffa::new();
        for _ in 0..50 {
            let p = mode.spawn_position(&world, &config);
            assert!(p.x.abs() <= 1500.0 && p.y.abs() <= 1500.0);
        }
    }
}
