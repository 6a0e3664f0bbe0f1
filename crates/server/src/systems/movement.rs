//! Player movement.

use crate::collision::speed_from_mass;
use crate::config::Config;
use crate::entity::Body;
use crate::math::clamp_length;
use crate::world::World;
use glam::Vec2;

/// Repulsion from living neighbours inside `radius`, scaled by closeness.
fn separation(pos: Vec2, self_id: u32, others: &[(u32, Vec2)], radius: f32) -> Vec2 {
    let mut push = Vec2::ZERO;
    for &(id, other) in others {
        if id == self_id {
            continue;
        }
        let delta = pos - other;
        let d = delta.length();
        if d > 0.1 && d < radius {
            push += delta / d * ((radius - d) / radius);
        }
    }
    push
}

/// Integrate every living player by one timestep and keep it inside the world.
///
/// Dashing players follow their dash velocity and ignore input. With
/// `crowd_separation`, bots steer toward their desired velocity plus a
/// separation push instead of snapping to it.
pub fn update(world: &mut World, config: &Config, crowd_separation: bool) {
    let dt = config.dt();
    let dt_ms = dt as f64 * 1000.0;
    let neighbours: Vec<(u32, Vec2)> = if crowd_separation {
        world.living().map(|p| (p.id, p.position)).collect()
    } else {
        Vec::new()
    };
    let border = world.border;
    let World {
        players,
        player_order,
        ..
    } = world;

    for id in player_order.iter() {
        let Some(p) = players.get_mut(id) else { continue };
        if !p.is_alive() {
            continue;
        }

        if p.dashing {
            let step_ms = dt_ms.min(p.dash_time_left_ms).max(0.0);
            p.position += p.dash_velocity * (step_ms / 1000.0) as f32;
            p.velocity = p.dash_velocity;
            p.dash_time_left_ms -= dt_ms;
            if p.dash_time_left_ms <= 0.0 {
                p.dashing = false;
                p.dash_time_left_ms = 0.0;
                p.velocity = Vec2::ZERO;
            }
        } else {
            let speed = speed_from_mass(p.mass(), &config.player);
            let desired = p.input.move_dir * speed;
            if crowd_separation && p.is_bot() {
                let push = separation(p.position, p.id, &neighbours, config.bots.separation_radius)
                    * config.bots.separation_force;
                let blend = (config.bots.steering_rate * dt).min(1.0);
                let steered = p.velocity + (desired + push - p.velocity) * blend;
                p.velocity = clamp_length(steered, speed);
            } else {
                p.velocity = desired;
            }
            p.position += p.velocity * dt;
        }

        p.angle = p.input.aim_angle;
        p.position = border.contain(p.position, p.radius());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ControlledBy;
    use crate::systems::dash;
    use crate::systems::testing::{quiet_config, spawn, world};

    fn step(w: &mut World, config: &Config) {
        w.advance(1000.0 / config.server.tick_rate as f64);
        dash::resolve(w, &config.dash);
        update(w, config, false);
    }

    #[test]
    fn test_walk_speed() {
        let config = quiet_config();
        let mut w = world(&config);
        let id = spawn(&mut w, &config, Vec2::ZERO);
        w.player_mut(id).unwrap().input.move_dir = Vec2::X;
        step(&mut w, &config);
        let expected = speed_from_mass(config.player.initial_mass, &config.player) / 60.0;
        assert!((w.player(id).unwrap().position.x - expected).abs() < 1e-4);
    }

    #[test]
    fn test_second_dash_in_cooldown_is_noop() {
        let config = quiet_config();
        let mut w = world(&config);
        let id = spawn(&mut w, &config, Vec2::ZERO);
        {
            let p = w.player_mut(id).unwrap();
            p.input.move_dir = Vec2::X;
            p.input.dash = true;
        }
        // 120ms of dash at 60Hz spans eight ticks, the last one partial.
        for _ in 0..8 {
            step(&mut w, &config);
        }
        let after_first = w.player(id).unwrap().position.x;
        assert!((after_first - config.dash.distance).abs() < 1e-2);
        assert!(!w.player(id).unwrap().dashing);

        w.player_mut(id).unwrap().input.dash = true;
        for _ in 0..8 {
            step(&mut w, &config);
        }
        let walked = 8.0 * speed_from_mass(config.player.initial_mass, &config.player) / 60.0;
        let p = w.player(id).unwrap();
        assert!((p.position.x - (after_first + walked)).abs() < 1e-2);
        assert!(!p.input.dash);
    }

    #[test]
    fn test_contained_in_world() {
        let config = quiet_config();
        let mut w = world(&config);
        let id = spawn(&mut w, &config, Vec2::new(1499.0, 0.0));
        w.player_mut(id).unwrap().input.move_dir = Vec2::X;
        step(&mut w, &config);
        let p = w.player(id).unwrap();
        assert!(p.position.x + p.radius() <= 1500.0 + 1e-3);
    }

    #[test]
    fn test_bots_separate() {
        let config = quiet_config();
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        let b = spawn(&mut w, &config, Vec2::new(10.0, 0.0));
        for id in [a, b] {
            w.player_mut(id).unwrap().controlled_by = ControlledBy::Bot;
        }
        w.advance(1000.0 / 60.0);
        update(&mut w, &config, true);
        assert!(w.player(a).unwrap().position.x < 0.0);
        assert!(w.player(b).unwrap().position.x > 10.0);
    }
}
