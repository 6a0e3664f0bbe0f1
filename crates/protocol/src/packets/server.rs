//! Server -> Client packet building.

use crate::{BinaryWriter, Color};

use super::ServerOpcode;

/// Ids start at 1; 0 encodes "none" on the wire.
fn put_opt_id(w: &mut BinaryWriter, id: Option<u32>) {
    w.put_u32(id.unwrap_or(0));
}

fn put_color(w: &mut BinaryWriter, color: Color) {
    w.put_u8(color.r);
    w.put_u8(color.g);
    w.put_u8(color.b);
}

/// World bounds as sent in Welcome and every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    /// Containment radius around the world center, 0 for rectangular worlds.
    pub arena_radius: f32,
}

impl WorldBounds {
    fn write(&self, w: &mut BinaryWriter) {
        w.put_f32(self.min_x);
        w.put_f32(self.min_y);
        w.put_f32(self.max_x);
        w.put_f32(self.max_y);
        w.put_f32(self.arena_radius);
    }
}

/// Build a Welcome packet (0x10).
pub fn build_welcome(
    player_id: u32,
    tick_rate: u16,
    snapshot_rate: u16,
    mode: u8,
    bounds: &WorldBounds,
) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(30);
    w.put_u8(ServerOpcode::Welcome as u8);
    w.put_u32(player_id);
    w.put_u16(tick_rate);
    w.put_u16(snapshot_rate);
    w.put_u8(mode);
    bounds.write(&mut w);
    w
}

/// Per-player entry of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub id: u32,
    pub name: String,
    pub color: Color,
    pub is_bot: bool,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub angle: f32,
    pub hp: u8,
    pub max_hp: u8,
    pub has_projectile: bool,
    pub dashing: bool,
    pub alive: bool,
    pub immune: bool,
    /// Milliseconds since the last hit, saturated; drives the hit flash.
    pub since_hit_ms: u32,
    pub kills: u32,
    pub deaths: u32,
    pub coins: u32,
    pub score: u32,
    /// Sequence number of the last input applied for this player.
    pub last_seq: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileView {
    pub id: u32,
    pub owner_id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub returning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub mass: f32,
}

/// One side of a kill-feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedName {
    pub name: String,
    pub color: Color,
}

/// Kill-feed entry. `killer` is `None` when the attacker already left.
#[derive(Debug, Clone, PartialEq)]
pub struct KillEvent {
    pub killer: Option<FeedName>,
    pub victim: FeedName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub id: u32,
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
    pub coins: u32,
}

/// Phase of the arena round machine.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    #[default]
    Waiting = 0,
    Warmup = 1,
    Active = 2,
    RoundEnd = 3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundView {
    pub phase: RoundPhase,
    pub time_left_ms: u32,
    pub last_winner: Option<u32>,
}

/// Full world view for one broadcast.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub tick: u64,
    pub bounds: WorldBounds,
    pub players: Vec<PlayerView>,
    pub projectiles: Vec<ProjectileView>,
    pub coins: Vec<CoinView>,
    pub food: Vec<FoodView>,
    pub kill_events: Vec<KillEvent>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub round: Option<RoundView>,
}

const PLAYER_HAS_PROJECTILE: u8 = 0x01;
const PLAYER_DASHING: u8 = 0x02;
const PLAYER_ALIVE: u8 = 0x04;
const PLAYER_IMMUNE: u8 = 0x08;
const PLAYER_BOT: u8 = 0x10;

/// Build a Snapshot packet (0x11).
///
/// Layout: tick, bounds, then each list prefixed by a u16 count, then an
/// optional round block flagged by a leading u8.
pub fn build_snapshot(snapshot: &Snapshot) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(64 + snapshot.players.len() * 64);
    w.put_u8(ServerOpcode::Snapshot as u8);
    w.put_u64(snapshot.tick);
    snapshot.bounds.write(&mut w);

    w.put_u16(snapshot.players.len() as u16);
    for p in &snapshot.players {
        w.put_u32(p.id);
        w.put_string_utf8(&p.name);
        put_color(&mut w, p.color);
        w.put_f32(p.x);
        w.put_f32(p.y);
        w.put_f32(p.vx);
        w.put_f32(p.vy);
        w.put_f32(p.radius);
        w.put_f32(p.angle);
        w.put_u8(p.hp);
        w.put_u8(p.max_hp);

        let mut flags = 0u8;
        if p.has_projectile {
            flags |= PLAYER_HAS_PROJECTILE;
        }
        if p.dashing {
            flags |= PLAYER_DASHING;
        }
        if p.alive {
            flags |= PLAYER_ALIVE;
        }
        if p.immune {
            flags |= PLAYER_IMMUNE;
        }
        if p.is_bot {
            flags |= PLAYER_BOT;
        }
        w.put_u8(flags);

        w.put_u32(p.since_hit_ms);
        w.put_u32(p.kills);
        w.put_u32(p.deaths);
        w.put_u32(p.coins);
        w.put_u32(p.score);
        w.put_u32(p.last_seq);
    }

    w.put_u16(snapshot.projectiles.len() as u16);
    for b in &snapshot.projectiles {
        w.put_u32(b.id);
        w.put_u32(b.owner_id);
        w.put_f32(b.x);
        w.put_f32(b.y);
        w.put_f32(b.radius);
        w.put_bool(b.returning);
    }

    w.put_u16(snapshot.coins.len() as u16);
    for c in &snapshot.coins {
        w.put_u32(c.id);
        w.put_f32(c.x);
        w.put_f32(c.y);
        w.put_u32(c.value);
    }

    w.put_u16(snapshot.food.len() as u16);
    for f in &snapshot.food {
        w.put_u32(f.id);
        w.put_f32(f.x);
        w.put_f32(f.y);
        w.put_f32(f.mass);
    }

    w.put_u16(snapshot.kill_events.len() as u16);
    for k in &snapshot.kill_events {
        match &k.killer {
            Some(killer) => {
                w.put_bool(true);
                w.put_string_utf8(&killer.name);
                put_color(&mut w, killer.color);
            }
            None => w.put_bool(false),
        }
        w.put_string_utf8(&k.victim.name);
        put_color(&mut w, k.victim.color);
    }

    w.put_u8(snapshot.leaderboard.len() as u8);
    for entry in &snapshot.leaderboard {
        w.put_u32(entry.id);
        w.put_string_utf8(&entry.name);
        w.put_u32(entry.kills);
        w.put_u32(entry.deaths);
        w.put_u32(entry.coins);
    }

    match &snapshot.round {
        Some(round) => {
            w.put_bool(true);
            w.put_u8(round.phase as u8);
            w.put_u32(round.time_left_ms);
            put_opt_id(&mut w, round.last_winner);
        }
        None => w.put_bool(false),
    }

    w
}

/// Build an Eliminated packet (0x12), sent to a human player on death.
pub fn build_eliminated(coins: u32, kills: u32) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(9);
    w.put_u8(ServerOpcode::Eliminated as u8);
    w.put_u32(coins);
    w.put_u32(kills);
    w
}

/// Arena notifications broadcast to every client.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    Hit {
        attacker_id: u32,
        victim_id: u32,
        damage: u8,
        hp_left: u8,
    },
    Eliminated {
        victim_id: u32,
        killer_id: Option<u32>,
    },
    /// `winner_id` is `None` when nobody survived the round.
    Winner {
        winner_id: Option<u32>,
        name: String,
    },
}

/// Build a RoundEvent packet (0x13).
pub fn build_round_event(event: &RoundEvent) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(16);
    w.put_u8(ServerOpcode::RoundEvent as u8);
    match event {
        RoundEvent::Hit {
            attacker_id,
            victim_id,
            damage,
            hp_left,
        } => {
            w.put_u8(0);
            w.put_u32(*attacker_id);
            w.put_u32(*victim_id);
            w.put_u8(*damage);
            w.put_u8(*hp_left);
        }
        RoundEvent::Eliminated {
            victim_id,
            killer_id,
        } => {
            w.put_u8(1);
            w.put_u32(*victim_id);
            put_opt_id(&mut w, *killer_id);
        }
        RoundEvent::Winner { winner_id, name } => {
            w.put_u8(2);
            put_opt_id(&mut w, *winner_id);
            w.put_string_utf8(name);
        }
    }
    w
}

/// Build a Rejected packet (0x14) carrying a human-readable reason.
pub fn build_rejected(reason: &str) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(ServerOpcode::Rejected as u8);
    w.put_string_utf8(reason);
    w
}

/// Build an ArenaFull packet (0x15).
pub fn build_arena_full(max_players: u16) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(3);
    w.put_u8(ServerOpcode::ArenaFull as u8);
    w.put_u16(max_players);
    w
}

/// Build a Balance packet (0x16).
pub fn build_balance(amount: f64) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(9);
    w.put_u8(ServerOpcode::Balance as u8);
    w.put_f64(amount);
    w
}

/// Build a CashedOut packet (0x17).
pub fn build_cashed_out(payout: f64, fee: f64) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(17);
    w.put_u8(ServerOpcode::CashedOut as u8);
    w.put_f64(payout);
    w.put_f64(fee);
    w
}

/// Build a DepositResult packet (0x18).
pub fn build_deposit_result(valid: bool, amount: f64, reason: &str) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(ServerOpcode::DepositResult as u8);
    w.put_bool(valid);
    w.put_f64(amount);
    w.put_string_utf8(reason);
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryReader;

    #[test]
    fn test_empty_snapshot_layout() {
        let data = build_snapshot(&Snapshot::default()).finish();
        // opcode + tick + bounds + 5 u16 counts + u8 leaderboard count + round flag
        assert_eq!(data.len(), 1 + 8 + 20 + 5 * 2 + 1 + 1);
        assert_eq!(data[0], 0x11);
    }

    #[test]
    fn test_round_event_winner_none() {
        let data = build_round_event(&RoundEvent::Winner {
            winner_id: None,
            name: String::new(),
        })
        .finish();
        let mut r = BinaryReader::new(data);
        assert_eq!(r.get_u8(), Ok(0x13));
        assert_eq!(r.get_u8(), Ok(2));
        assert_eq!(r.get_u32(), Ok(0));
    }

    #[test]
    fn test_welcome() {
        let bounds = WorldBounds {
            max_x: 3000.0,
            max_y: 3000.0,
            ..Default::default()
        };
        let mut r = BinaryReader::new(build_welcome(5, 60, 30, 1, &bounds).finish());
        assert_eq!(r.get_u8(), Ok(0x10));
        assert_eq!(r.get_u32(), Ok(5));
        assert_eq!(r.get_u16(), Ok(60));
        assert_eq!(r.get_u16(), Ok(30));
        assert_eq!(r.get_u8(), Ok(1));
        assert_eq!(r.get_f32(), Ok(0.0));
        assert_eq!(r.get_f32(), Ok(0.0));
        assert_eq!(r.get_f32(), Ok(3000.0));
    }

    #[test]
    fn test_cashed_out_amounts() {
        let mut r = BinaryReader::new(build_cashed_out(8.5, 1.5).finish());
        assert_eq!(r.get_u8(), Ok(0x17));
        assert_eq!(r.get_f64(), Ok(8.5));
        assert_eq!(r.get_f64(), Ok(1.5));
        assert!(r.get_u8().is_err());
    }
}
