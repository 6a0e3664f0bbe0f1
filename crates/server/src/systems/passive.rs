//! Regeneration, coin pickup and the free-for-all food economy.

use crate::collision::check_circles;
use crate::config::Config;
use crate::entity::Body;
use crate::world::World;

/// Fixed-interval regeneration: +1 hp once `regen_interval_ms` has passed
/// since the last hit or the last regen tick.
pub fn regenerate(world: &mut World, config: &Config) {
    let now = world.now;
    let interval = config.player.regen_interval_ms;
    for p in world.players.values_mut() {
        if p.is_alive() && p.hp < p.max_hp && now - p.regen_from >= interval {
            p.heal(1);
            p.regen_from = now;
        }
    }
}

/// Hand each coin to the first living player, in player order, whose pickup
/// radius covers it.
pub fn collect_coins(world: &mut World, config: &Config) {
    let factor = config.player.coin_pickup_factor;
    let pickup_score = config.coins.pickup_score;
    let World {
        players,
        player_order,
        coins,
        ..
    } = world;

    coins.retain(|coin| {
        for id in player_order.iter() {
            let Some(p) = players.get_mut(id) else { continue };
            if !p.is_alive() {
                continue;
            }
            if p.position.distance(coin.position) < p.radius() * factor {
                p.coins += coin.value;
                p.score += pickup_score * coin.value;
                return false;
            }
        }
        true
    });
}

/// Drop coins older than `lifetime_ms`.
pub fn expire_coins(world: &mut World, lifetime_ms: f64) {
    let now = world.now;
    world.coins.retain(|c| !c.is_expired(now, lifetime_ms));
}

/// Living players eat the food they cover, then the pellet count is topped up.
pub fn eat_food(world: &mut World, config: &Config) {
    let max_mass = config.player.max_mass;
    {
        let World {
            players,
            player_order,
            food,
            ..
        } = &mut *world;

        food.retain(|pellet| {
            for id in player_order.iter() {
                let Some(p) = players.get_mut(id) else { continue };
                if !p.is_alive() {
                    continue;
                }
                if check_circles(p.position, p.radius(), pellet.position, pellet.eat_radius())
                    .is_touching()
                {
                    p.set_mass((p.mass() + pellet.mass).min(max_mass));
                    p.score += 1;
                    return false;
                }
            }
            true
        });
    }
    world.ensure_food(config);
}

/// Exponential decay of mass above the floor.
pub fn decay_mass(world: &mut World, config: &Config) {
    let dt = config.dt();
    let floor = config.player.min_mass;
    let rate = config.player.mass_decay_per_second;
    for p in world.players.values_mut() {
        let mass = p.mass();
        if !p.is_alive() || mass <= floor {
            continue;
        }
        p.set_mass((mass - (mass - floor) * rate * dt).max(floor));
    }
}
