//! Boomerang throwing and flight.

use crate::config::{BoomerangConfig, Config};
use crate::entity::{Body, Boomerang, Phase};
use crate::gamemodes::GameMode;
use crate::math::from_angle;
use crate::world::World;
use glam::Vec2;
use tracing::trace;

/// Consume pending shoot flags and spawn boomerangs for valid throws.
///
/// With auto-aim the throw goes toward the nearest living enemy inside the
/// lock radius; if there is none the throw is dropped and the player keeps
/// its boomerang.
pub fn throw(world: &mut World, config: &Config, mode: &dyn GameMode) {
    let now = world.now;
    let cfg = &config.boomerang;
    let immunity = config.player.spawn_immunity_ms;
    let mode_allows = mode.allows_throw();
    let auto_aim = mode.auto_aim(config);

    let mut throwers: Vec<(u32, Vec2, f32, f32)> = Vec::new();
    {
        let World {
            players,
            player_order,
            ..
        } = &mut *world;
        for id in player_order.iter() {
            let Some(p) = players.get_mut(id) else { continue };
            if !p.input.take_shoot() {
                continue;
            }
            if !mode_allows || !p.is_alive() || !p.has_projectile || p.is_immune(now, immunity) {
                continue;
            }
            if p.last_throw_at.is_some_and(|at| now - at < cfg.throw_cooldown_ms) {
                continue;
            }
            throwers.push((p.id, p.position, p.radius(), p.input.aim_angle));
        }
    }

    for (id, pos, radius, aim) in throwers {
        let dir = if auto_aim {
            let Some((target, _)) = world.nearest_living(pos, id, cfg.lock_radius) else {
                continue;
            };
            let Some(target) = world.player(target) else { continue };
            let delta = target.position - pos;
            if delta.length() <= f32::EPSILON {
                from_angle(aim)
            } else {
                delta.normalize()
            }
        } else {
            from_angle(aim)
        };

        let boomerang_id = world.next_id();
        let b_radius = (radius * cfg.radius_factor).max(cfg.min_radius);
        world.boomerangs.push(Boomerang::new(
            boomerang_id,
            id,
            pos + dir * radius,
            dir,
            cfg.speed,
            b_radius,
            now,
        ));
        if let Some(p) = world.player_mut(id) {
            p.has_projectile = false;
            p.last_throw_at = Some(now);
            p.angle = dir.y.atan2(dir.x);
        }
        trace!("Player {} threw boomerang {}", id, boomerang_id);
    }
}

/// Advance every boomerang by one timestep.
///
/// Outbound boomerangs fly straight until `max_distance`, then home on their
/// owner at the return speed. A boomerang is destroyed when its owner is gone
/// or dead, when it is caught, or when it outlives `max_flight_ms`; the last
/// two give the owner its boomerang back.
pub fn update_flight(world: &mut World, cfg: &BoomerangConfig, dt: f32) {
    let now = world.now;
    let World {
        players,
        boomerangs,
        ..
    } = world;

    boomerangs.retain_mut(|b| {
        let Some(owner) = players.get_mut(&b.owner_id) else {
            return false;
        };
        if !owner.is_alive() {
            return false;
        }
        if now - b.spawned_at > cfg.max_flight_ms {
            owner.has_projectile = true;
            return false;
        }

        match b.phase {
            Phase::Outbound => {
                let step = b.speed * dt;
                b.position += b.direction * step;
                b.traveled += step;
                if b.traveled >= cfg.max_distance {
                    b.start_return();
                }
                true
            }
            Phase::Returning => {
                let to_owner = owner.position - b.position;
                let d = to_owner.length();
                if d < owner.radius() + cfg.catch_radius {
                    owner.has_projectile = true;
                    return false;
                }
                let dir = to_owner / d;
                let step = b.speed * cfg.return_speed_factor * dt;
                b.direction = dir;
                b.position += dir * step;
                b.return_traveled += step;
                true
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamemodes::{arena::Arena, ffa::Ffa};
    use crate::systems::testing::{quiet_config, spawn, world};

    #[test]
    fn test_throw_spawns_at_edge() {
        let config = quiet_config();
        let mut w = world(&config);
        let id = spawn(&mut w, &config, Vec2::ZERO);
        {
            let p = w.player_mut(id).unwrap();
            p.input.shoot = true;
            p.input.aim_angle = std::f32::consts::FRAC_PI_2;
        }
        throw(&mut w, &config, &Ffa::new());

        let p = w.player(id).unwrap();
        assert!(!p.has_projectile);
        assert_eq!(w.boomerangs.len(), 1);
        let b = &w.boomerangs[0];
        assert!((b.position - Vec2::new(0.0, p.radius())).length() < 1e-4);
        assert!((b.radius - (p.radius() * 0.3).max(3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_immune_player_cannot_throw() {
        let mut config = quiet_config();
        config.player.spawn_immunity_ms = 3000.0;
        let mut w = world(&config);
        let id = spawn(&mut w, &config, Vec2::ZERO);
        w.player_mut(id).unwrap().input.shoot = true;
        throw(&mut w, &config, &Ffa::new());
        assert!(w.boomerangs.is_empty());
        let p = w.player(id).unwrap();
        assert!(p.has_projectile);
        assert!(!p.input.shoot);
    }

    #[test]
    fn test_auto_aim_without_target_keeps_boomerang() {
        let config = quiet_config();
        let mut w = world(&config);
        let me = spawn(&mut w, &config, Vec2::ZERO);
        let far = spawn(&mut w, &config, Vec2::new(500.0, 0.0));
        let mut arena = Arena::new();
        arena.phase = protocol::packets::RoundPhase::Active;

        w.player_mut(me).unwrap().input.shoot = true;
        throw(&mut w, &config, &arena);
        assert!(w.boomerangs.is_empty());
        assert!(w.player(me).unwrap().has_projectile);

        w.player_mut(far).unwrap().position = Vec2::new(0.0, -100.0);
        w.player_mut(me).unwrap().input.shoot = true;
        throw(&mut w, &config, &arena);
        assert_eq!(w.boomerangs.len(), 1);
        assert!((w.boomerangs[0].direction - Vec2::new(0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_returning_boomerang_is_caught() {
        let config = quiet_config();
        let mut w = world(&config);
        let owner = spawn(&mut w, &config, Vec2::ZERO);
        w.player_mut(owner).unwrap().has_projectile = false;
        let id = w.next_id();
        let mut b = Boomerang::new(id, owner, Vec2::new(2.0, 0.0), Vec2::X, 180.0, 3.0, 0.0);
        b.start_return();
        w.boomerangs.push(b);

        update_flight(&mut w, &config.boomerang, config.dt());
        assert!(w.boomerangs.is_empty());
        assert!(w.player(owner).unwrap().has_projectile);
    }

    #[test]
    fn test_outbound_turns_at_max_distance() {
        let config = quiet_config();
        let mut w = world(&config);
        let owner = spawn(&mut w, &config, Vec2::new(-500.0, 0.0));
        let id = w.next_id();
        w.boomerangs
            .push(Boomerang::new(id, owner, Vec2::ZERO, Vec2::X, 180.0, 3.0, 0.0));

        let ticks = (config.boomerang.max_distance / (180.0 * config.dt())).ceil() as usize;
        for _ in 0..ticks {
            assert!(!w.boomerangs[0].is_returning());
            update_flight(&mut w, &config.boomerang, config.dt());
        }
        assert!(w.boomerangs[0].is_returning());
    }

    #[test]
    fn test_flight_cap_restores_possession() {
        let config = quiet_config();
        let mut w = world(&config);
        let owner = spawn(&mut w, &config, Vec2::ZERO);
        w.player_mut(owner).unwrap().has_projectile = false;
        let id = w.next_id();
        w.boomerangs
            .push(Boomerang::new(id, owner, Vec2::new(900.0, 0.0), Vec2::X, 0.0, 3.0, 0.0));
        w.now = config.boomerang.max_flight_ms + 1.0;
        update_flight(&mut w, &config.boomerang, config.dt());
        assert!(w.boomerangs.is_empty());
        assert!(w.player(owner).unwrap().has_projectile);
    }

    #[test]
    fn test_dead_owner_destroys_boomerang() {
        let config = quiet_config();
        let mut w = world(&config);
        let owner = spawn(&mut w, &config, Vec2::ZERO);
        let id = w.next_id();
        w.boomerangs
            .push(Boomerang::new(id, owner, Vec2::new(50.0, 0.0), Vec2::X, 180.0, 3.0, 0.0));
        w.player_mut(owner).unwrap().kill(0.0);
        update_flight(&mut w, &config.boomerang, config.dt());
        assert!(w.boomerangs.is_empty());
    }
}
