//! Combat resolution: boomerang hits, deaths and coin drops.

use crate::collision::check_circles;
use crate::config::Config;
use crate::entity::{Body, Coin};
use crate::world::{DeathRecord, World};
use glam::Vec2;
use protocol::packets::{FeedName, KillEvent, RoundEvent};
use tracing::info;

/// Resolve boomerang contacts for this tick.
///
/// Targets are scanned in player order and a boomerang damages at most one
/// target per tick. Dead players drop their coins and lose every boomerang
/// they own before this returns.
pub fn resolve(world: &mut World, config: &Config) {
    let now = world.now;
    let immunity = config.player.spawn_immunity_ms;
    let cfg = &config.boomerang;
    let mut drops: Vec<(Vec2, u32)> = Vec::new();

    {
        let World {
            players,
            player_order,
            boomerangs,
            kill_events,
            round_events,
            deaths,
            ..
        } = &mut *world;

        for b in boomerangs.iter_mut() {
            let owner_ok = players
                .get(&b.owner_id)
                .is_some_and(|o| o.is_alive() && !o.is_immune(now, immunity));
            if !owner_ok {
                continue;
            }

            for &target_id in player_order.iter() {
                if target_id == b.owner_id {
                    continue;
                }
                let Some(target) = players.get_mut(&target_id) else { continue };
                if !target.is_alive()
                    || target.is_immune(now, immunity)
                    || !b.can_hit(target_id, cfg.real_return_distance)
                {
                    continue;
                }
                if !check_circles(target.position, target.radius(), b.position, b.radius)
                    .is_touching()
                {
                    continue;
                }

                let damage = b.damage(cfg.outbound_damage, cfg.return_damage, cfg.real_return_distance);
                let was_outbound = !b.is_returning();
                b.record_hit(target_id);
                let lethal = target.apply_damage(damage, now);
                round_events.push(RoundEvent::Hit {
                    attacker_id: b.owner_id,
                    victim_id: target_id,
                    damage,
                    hp_left: target.hp,
                });
                if was_outbound {
                    b.start_return();
                }

                if lethal {
                    let held = std::mem::take(&mut target.coins);
                    target.kill(now);
                    drops.push((target.position, held));
                    deaths.push(DeathRecord {
                        victim_id: target_id,
                        killer_id: Some(b.owner_id),
                        coins: held,
                        kills: target.kills,
                    });
                    let victim = FeedName {
                        name: target.name.clone(),
                        color: target.color,
                    };

                    let killer = players.get_mut(&b.owner_id).map(|k| {
                        k.kills += 1;
                        k.score += config.coins.kill_score;
                        k.heal(1);
                        FeedName {
                            name: k.name.clone(),
                            color: k.color,
                        }
                    });
                    info!(
                        "{} eliminated {}",
                        killer.as_ref().map_or("?", |k| k.name.as_str()),
                        victim.name
                    );
                    kill_events.push(KillEvent { killer, victim });
                    round_events.push(RoundEvent::Eliminated {
                        victim_id: target_id,
                        killer_id: Some(b.owner_id),
                    });
                }
                break;
            }
        }

        boomerangs.retain(|b| players.get(&b.owner_id).is_some_and(|p| p.is_alive()));
    }

    for (pos, value) in drops {
        if value == 0 {
            continue;
        }
        let id = world.next_id();
        world.coins.push(Coin::new(id, pos, value, now));
    }
}

/// Remove players whose death linger has elapsed. Returns their ids.
pub fn reap_dead(world: &mut World, linger_ms: f64) -> Vec<u32> {
    let now = world.now;
    let expired: Vec<u32> = world
        .players()
        .filter(|p| p.dead_for(now).is_some_and(|d| d >= linger_ms))
        .map(|p| p.id)
        .collect();
    for id in &expired {
        world.remove_player(*id);
    }
    expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Boomerang;
    use crate::systems::testing::{quiet_config, spawn, world};

    fn boomerang(w: &mut World, owner: u32, pos: Vec2) -> usize {
        let id = w.next_id();
        w.boomerangs
            .push(Boomerang::new(id, owner, pos, Vec2::X, 180.0, 3.0, 0.0));
        w.boomerangs.len() - 1
    }

    #[test]
    fn test_outbound_hit_flips_to_return() {
        let config = quiet_config();
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        let b = spawn(&mut w, &config, Vec2::new(50.0, 0.0));
        boomerang(&mut w, a, Vec2::new(45.0, 0.0));

        resolve(&mut w, &config);
        assert_eq!(w.player(b).unwrap().hp, 2);
        assert!(w.boomerangs[0].is_returning());
        assert_eq!(
            w.round_events,
            vec![RoundEvent::Hit { attacker_id: a, victim_id: b, damage: 1, hp_left: 2 }]
        );

        // Same position next tick: already hit on this leg.
        resolve(&mut w, &config);
        assert_eq!(w.player(b).unwrap().hp, 2);
    }

    #[test]
    fn test_one_target_per_tick() {
        let config = quiet_config();
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        let b = spawn(&mut w, &config, Vec2::new(50.0, 0.0));
        let c = spawn(&mut w, &config, Vec2::new(52.0, 0.0));
        boomerang(&mut w, a, Vec2::new(51.0, 0.0));

        resolve(&mut w, &config);
        assert_eq!(w.player(b).unwrap().hp, 2);
        assert_eq!(w.player(c).unwrap().hp, 3);
    }

    #[test]
    fn test_kill_drops_coins_and_rewards_killer() {
        let config = quiet_config();
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        let b = spawn(&mut w, &config, Vec2::new(50.0, 0.0));
        {
            let killer = w.player_mut(a).unwrap();
            killer.hp = 1;
        }
        {
            let victim = w.player_mut(b).unwrap();
            victim.hp = 1;
            victim.coins = 7;
        }
        boomerang(&mut w, a, Vec2::new(50.0, 0.0));
        boomerang(&mut w, b, Vec2::new(60.0, 0.0));

        resolve(&mut w, &config);

        let victim = w.player(b).unwrap();
        assert!(!victim.is_alive());
        assert_eq!(victim.coins, 0);
        assert_eq!(victim.deaths, 1);
        let killer = w.player(a).unwrap();
        assert_eq!(killer.kills, 1);
        assert_eq!(killer.score, config.coins.kill_score);
        assert_eq!(killer.hp, 2);

        assert_eq!(w.coins.len(), 1);
        assert_eq!(w.coins[0].value, 7);
        assert_eq!(w.coins[0].position, Vec2::new(50.0, 0.0));
        assert!(w.boomerangs.iter().all(|bm| bm.owner_id != b));
        assert_eq!(w.kill_events.len(), 1);
        assert_eq!(w.deaths[0].coins, 7);
    }

    #[test]
    fn test_broke_victim_drops_nothing() {
        let config = quiet_config();
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        let b = spawn(&mut w, &config, Vec2::new(50.0, 0.0));
        {
            let victim = w.player_mut(b).unwrap();
            victim.hp = 1;
            victim.coins = 0;
        }
        boomerang(&mut w, a, Vec2::new(50.0, 0.0));
        resolve(&mut w, &config);
        assert!(!w.player(b).unwrap().is_alive());
        assert!(w.coins.is_empty());
    }

    #[test]
    fn test_dead_target_is_passed_over() {
        let config = quiet_config();
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        let b = spawn(&mut w, &config, Vec2::new(50.0, 0.0));
        w.player_mut(b).unwrap().kill(0.0);
        boomerang(&mut w, a, Vec2::new(50.0, 0.0));

        resolve(&mut w, &config);
        let body = w.player(b).unwrap();
        assert_eq!(body.hp, body.max_hp);
        assert_eq!(body.deaths, 1);
        assert!(!w.boomerangs[0].is_returning());
        assert!(w.round_events.is_empty());
        assert!(w.kill_events.is_empty());
    }

    #[test]
    fn test_immune_target_untouched() {
        let mut config = quiet_config();
        config.player.spawn_immunity_ms = 3000.0;
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        let b = spawn(&mut w, &config, Vec2::new(50.0, 0.0));
        w.player_mut(a).unwrap().spawned_at = -10_000.0;
        boomerang(&mut w, a, Vec2::new(50.0, 0.0));
        resolve(&mut w, &config);
        assert_eq!(w.player(b).unwrap().hp, 3);
        assert!(!w.boomerangs[0].is_returning());
    }

    #[test]
    fn test_reap_after_linger() {
        let config = quiet_config();
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        w.player_mut(a).unwrap().kill(0.0);
        w.now = 1000.0;
        assert!(reap_dead(&mut w, 1500.0).is_empty());
        w.now = 1500.0;
        assert_eq!(reap_dead(&mut w, 1500.0), vec![a]);
        assert!(w.player(a).is_none());
    }
}
