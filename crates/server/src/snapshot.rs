//! Snapshot building.

use crate::config::Config;
use crate::entity::Body;
use crate::gamemodes::GameMode;
use crate::world::World;
use protocol::packets::{
    CoinView, FoodView, LeaderboardEntry, PlayerView, ProjectileView, Snapshot,
};

/// Entries shown on the leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// Build the broadcast view of the world.
///
/// Drains the kill feed; everything else is read-only, so two calls without
/// a tick in between differ only in `kill_events`.
pub fn build(world: &mut World, mode: &dyn GameMode, config: &Config) -> Snapshot {
    let now = world.now;
    let immunity = config.player.spawn_immunity_ms;

    let players = world
        .players()
        .map(|p| PlayerView {
            id: p.id,
            name: p.name.clone(),
            color: p.color,
            is_bot: p.is_bot(),
            x: p.position.x,
            y: p.position.y,
            vx: p.velocity.x,
            vy: p.velocity.y,
            radius: p.radius(),
            angle: p.angle,
            hp: p.hp,
            max_hp: p.max_hp,
            has_projectile: p.has_projectile,
            dashing: p.dashing,
            alive: p.is_alive(),
            immune: p.is_immune(now, immunity),
            since_hit_ms: p
                .last_hit_at
                .map_or(u32::MAX, |at| (now - at).clamp(0.0, u32::MAX as f64) as u32),
            kills: p.kills,
            deaths: p.deaths,
            coins: p.coins,
            score: p.score,
            last_seq: p.last_seq,
        })
        .collect();

    let mut ranked: Vec<_> = world.living().collect();
    ranked.sort_by(|a, b| b.kills.cmp(&a.kills).then(a.deaths.cmp(&b.deaths)));
    let leaderboard = ranked
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|p| LeaderboardEntry {
            id: p.id,
            name: p.name.clone(),
            kills: p.kills,
            deaths: p.deaths,
            coins: p.coins,
        })
        .collect();

    let projectiles = world
        .boomerangs
        .iter()
        .map(|b| ProjectileView {
            id: b.id,
            owner_id: b.owner_id,
            x: b.position.x,
            y: b.position.y,
            radius: b.radius,
            returning: b.is_returning(),
        })
        .collect();

    let coins = world
        .coins
        .iter()
        .map(|c| CoinView {
            id: c.id,
            x: c.position.x,
            y: c.position.y,
            value: c.value,
        })
        .collect();

    let food = world
        .food
        .iter()
        .map(|f| FoodView {
            id: f.id,
            x: f.position.x,
            y: f.position.y,
            mass: f.mass,
        })
        .collect();

    Snapshot {
        tick: world.tick,
        bounds: world.border.bounds(),
        players,
        projectiles,
        coins,
        food,
        kill_events: std::mem::take(&mut world.kill_events),
        leaderboard,
        round: mode.round_view(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamemodes::ffa::Ffa;
    use crate::systems::testing::{quiet_config, spawn, world};
    use glam::Vec2;
    use protocol::packets::{FeedName, KillEvent};
    use protocol::Color;

    #[test]
    fn test_second_build_only_loses_kill_feed() {
        let config = quiet_config();
        let mut w = world(&config);
        spawn(&mut w, &config, Vec2::ZERO);
        w.kill_events.push(KillEvent {
            killer: None,
            victim: FeedName { name: "x".into(), color: Color::default() },
        });
        let mode = Ffa::new();

        let first = build(&mut w, &mode, &config);
        let second = build(&mut w, &mode, &config);
        assert_eq!(first.kill_events.len(), 1);
        assert!(second.kill_events.is_empty());
        assert_eq!(Snapshot { kill_events: Vec::new(), ..first }, second);
    }

    #[test]
    fn test_leaderboard_order() {
        let config = quiet_config();
        let mut w = world(&config);
        let a = spawn(&mut w, &config, Vec2::ZERO);
        let b = spawn(&mut w, &config, Vec2::ZERO);
        let c = spawn(&mut w, &config, Vec2::ZERO);
        let dead = spawn(&mut w, &config, Vec2::ZERO);
        w.player_mut(a).unwrap().kills = 1;
        w.player_mut(a).unwrap().deaths = 2;
        w.player_mut(b).unwrap().kills = 1;
        w.player_mut(c).unwrap().kills = 3;
        {
            let p = w.player_mut(dead).unwrap();
            p.kills = 9;
            p.kill(0.0);
        }

        let snap = build(&mut w, &Ffa::new(), &config);
        let order: Vec<u32> = snap.leaderboard.iter().map(|e| e.id).collect();
        assert_eq!(order, vec![c, b, a]);
        assert_eq!(snap.players.len(), 4);
        assert!(snap.round.is_none());
    }
}
