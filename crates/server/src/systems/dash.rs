//! Dash resolution.

use crate::config::DashConfig;
use crate::math::normalize_or_zero;
use crate::world::World;
use glam::Vec2;

/// Consume every pending dash flag and start the dashes that are allowed.
///
/// A dash needs a living player off cooldown with a non-zero move vector;
/// the flag is cleared either way.
pub fn resolve(world: &mut World, config: &DashConfig) {
    let now = world.now;
    let World {
        players,
        player_order,
        ..
    } = world;

    for id in player_order.iter() {
        let Some(p) = players.get_mut(id) else { continue };
        if !p.input.take_dash() || !p.is_alive() || p.dashing {
            continue;
        }
        if p.last_dash_at.is_some_and(|at| now - at < config.cooldown_ms) {
            continue;
        }
        let dir = normalize_or_zero(p.input.move_dir);
        if dir == Vec2::ZERO || config.duration_ms <= 0.0 {
            continue;
        }

        let speed = config.distance / (config.duration_ms / 1000.0) as f32;
        p.dash_velocity = dir * speed;
        p.dashing = true;
        p.dash_time_left_ms = config.duration_ms;
        p.last_dash_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::{quiet_config, spawn, world};

    #[test]
    fn test_dash_needs_direction() {
        let config = quiet_config();
        let mut w = world(&config);
        let id = spawn(&mut w, &config, Vec2::ZERO);
        w.player_mut(id).unwrap().input.dash = true;

        resolve(&mut w, &config.dash);
        let p = w.player(id).unwrap();
        assert!(!p.dashing);
        assert!(!p.input.dash);
        assert_eq!(p.last_dash_at, None);
    }

    #[test]
    fn test_dash_velocity_and_cooldown() {
        let config = quiet_config();
        let mut w = world(&config);
        let id = spawn(&mut w, &config, Vec2::ZERO);
        {
            let p = w.player_mut(id).unwrap();
            p.input.move_dir = Vec2::Y;
            p.input.dash = true;
        }
        w.now = 5000.0;
        resolve(&mut w, &config.dash);
        {
            let p = w.player_mut(id).unwrap();
            assert!(p.dashing);
            assert!((p.dash_velocity.y - 55.0 / 0.12).abs() < 1e-2);
            assert_eq!(p.last_dash_at, Some(5000.0));
            p.dashing = false;
            p.input.dash = true;
        }

        w.now = 5000.0 + config.dash.cooldown_ms - 1.0;
        resolve(&mut w, &config.dash);
        assert!(!w.player(id).unwrap().dashing);
        assert_eq!(w.player(id).unwrap().last_dash_at, Some(5000.0));
    }
}
