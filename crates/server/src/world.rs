//! World state management.
//!
//! Owns every entity. Systems mutate it in place once per tick and refer to
//! players by id.

use crate::config::{Config, WorldConfig};
use crate::entity::{Boomerang, Coin, Food, Player};
use glam::Vec2;
use protocol::packets::{KillEvent, RoundEvent, WorldBounds};
use protocol::Color;
use rand::Rng;
use std::collections::HashMap;

/// Palette players are colored from, in join order.
pub const PLAYER_COLORS: [u32; 8] = [
    0x7cf7b2, 0xff7a7a, 0x7ab8ff, 0xffcf7a, 0xd17aff, 0x7affea, 0xff7ad1, 0xb8ff7a,
];

/// Hands out player colors round-robin. One per game, not process-wide.
#[derive(Debug, Default)]
pub struct ColorCycle {
    index: usize,
}

impl ColorCycle {
    pub fn next_color(&mut self) -> Color {
        let color = Color::from_hex(PLAYER_COLORS[self.index % PLAYER_COLORS.len()]);
        self.index = self.index.wrapping_add(1);
        color
    }
}

/// How bodies are kept inside the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Containment {
    /// Clamp to the rectangular border.
    Rect,
    /// Keep within `radius` of the world center.
    Circle { radius: f32 },
}

/// World border bounds.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub width: f32,
    pub height: f32,
    pub containment: Containment,
}

impl WorldBorder {
    pub fn new(width: f32, height: f32, containment: Containment) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self {
            min_x: -half_w,
            min_y: -half_h,
            max_x: half_w,
            max_y: half_h,
            width,
            height,
            containment,
        }
    }

    /// Random position at least `padding` inside the playable area.
    pub fn random_position(&self, padding: f32) -> Vec2 {
        let mut rng = rand::rng();
        match self.containment {
            Containment::Rect => {
                let hw = (self.width / 2.0 - padding).max(0.0);
                let hh = (self.height / 2.0 - padding).max(0.0);
                Vec2::new(rng.random_range(-hw..=hw), rng.random_range(-hh..=hh))
            }
            Containment::Circle { radius } => {
                let r = (radius - padding).max(0.0) * rng.random::<f32>().sqrt();
                let angle = rng.random_range(0.0..std::f32::consts::TAU);
                Vec2::new(angle.cos(), angle.sin()) * r
            }
        }
    }

    /// Pull a body of `radius` at `pos` back inside the world.
    pub fn contain(&self, pos: Vec2, radius: f32) -> Vec2 {
        match self.containment {
            Containment::Rect => {
                let max_x = (self.max_x - radius).max(0.0);
                let max_y = (self.max_y - radius).max(0.0);
                Vec2::new(pos.x.clamp(-max_x, max_x), pos.y.clamp(-max_y, max_y))
            }
            Containment::Circle { radius: arena } => {
                let limit = (arena - radius).max(0.0);
                let d = pos.length();
                if d > limit && d > 0.0 { pos * (limit / d) } else { pos }
            }
        }
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds {
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.max_x,
            max_y: self.max_y,
            arena_radius: match self.containment {
                Containment::Rect => 0.0,
                Containment::Circle { radius } => radius,
            },
        }
    }
}

/// A death recorded during combat, drained by the game state.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathRecord {
    pub victim_id: u32,
    pub killer_id: Option<u32>,
    /// Coins the victim held when it died.
    pub coins: u32,
    pub kills: u32,
}

/// The game world containing all entities.
#[derive(Debug)]
pub struct World {
    /// Next entity ID to assign.
    next_entity_id: u32,

    /// Players by ID.
    pub(crate) players: HashMap<u32, Player>,
    /// Player iteration order.
    pub player_order: Vec<u32>,
    /// Position in `player_order` for O(1) removal.
    player_pos: HashMap<u32, usize>,

    pub boomerangs: Vec<Boomerang>,
    pub coins: Vec<Coin>,
    pub food: Vec<Food>,

    /// World border.
    pub border: WorldBorder,

    /// Ticks simulated so far.
    pub tick: u64,
    /// Simulation clock in milliseconds; advances by exactly one timestep per tick.
    pub now: f64,

    /// Kill feed, drained by the snapshot builder.
    pub kill_events: Vec<KillEvent>,
    /// Hit / elimination / winner notifications, drained every tick.
    pub round_events: Vec<RoundEvent>,
    /// Deaths this tick, drained every tick.
    pub deaths: Vec<DeathRecord>,
}

impl World {
    /// Create a new world.
    pub fn new(config: &WorldConfig, containment: Containment) -> Self {
        Self {
            next_entity_id: 1,
            players: HashMap::with_capacity(16),
            player_order: Vec::with_capacity(16),
            player_pos: HashMap::with_capacity(16),
            boomerangs: Vec::with_capacity(16),
            coins: Vec::with_capacity(32),
            food: Vec::new(),
            border: WorldBorder::new(config.width, config.height, containment),
            tick: 0,
            now: 0.0,
            kill_events: Vec::new(),
            round_events: Vec::new(),
            deaths: Vec::new(),
        }
    }

    /// Get the next entity ID. Never returns 0.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id = self.next_entity_id.wrapping_add(1);
        if self.next_entity_id == 0 {
            self.next_entity_id = 1;
        }
        id
    }

    /// Step the clock by one timestep.
    pub fn advance(&mut self, dt_ms: f64) {
        self.tick += 1;
        self.now = self.tick as f64 * dt_ms;
    }

    /// Get a player by ID.
    #[inline]
    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get a mutable player by ID.
    #[inline]
    pub fn player_mut(&mut self, id: u32) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Players in iteration order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.player_order.iter().filter_map(|id| self.players.get(id))
    }

    /// Living players in iteration order.
    pub fn living(&self) -> impl Iterator<Item = &Player> {
        self.players().filter(|p| p.is_alive())
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn human_count(&self) -> usize {
        self.players.values().filter(|p| !p.is_bot()).count()
    }

    /// Add a player to the world.
    pub fn add_player(&mut self, player: Player) -> u32 {
        let id = player.id;
        let pos = self.player_order.len();
        self.player_order.push(id);
        self.player_pos.insert(id, pos);
        self.players.insert(id, player);
        id
    }

    /// Remove a player and every projectile it owns (O(1) for the order list).
    pub fn remove_player(&mut self, id: u32) -> Option<Player> {
        let player = self.players.remove(&id)?;
        if let Some(pos) = self.player_pos.remove(&id) {
            let last_pos = self.player_order.len() - 1;
            if pos != last_pos {
                let swapped_id = self.player_order[last_pos];
                self.player_order.swap(pos, last_pos);
                self.player_pos.insert(swapped_id, pos);
            }
            self.player_order.pop();
        }
        self.boomerangs.retain(|b| b.owner_id != id);
        Some(player)
    }

    /// Closest living player to `from` other than `exclude`, within `max_dist`.
    ///
    /// Exact ties keep the first player in iteration order.
    pub fn nearest_living(&self, from: Vec2, exclude: u32, max_dist: f32) -> Option<(u32, f32)> {
        let mut best: Option<(u32, f32)> = None;
        for p in self.living() {
            if p.id == exclude {
                continue;
            }
            let d = p.position.distance(from);
            if d > max_dist {
                continue;
            }
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((p.id, d));
            }
        }
        best
    }

    /// Top up food to `count` pellets.
    pub fn ensure_food(&mut self, config: &Config) {
        let mut rng = rand::rng();
        while self.food.len() < config.food.count {
            let (lo, hi) = (config.food.mass_min, config.food.mass_max);
            let mass = if hi > lo { rng.random_range(lo..hi) } else { lo };
            let pos = self.border.random_position(2.0);
            let id = self.next_id();
            self.food.push(Food::new(id, pos, mass));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ControlledBy;

    fn world() -> World {
        World::new(&WorldConfig::default(), Containment::Rect)
    }

    fn add(world: &mut World, pos: Vec2) -> u32 {
        let id = world.next_id();
        let player = Player::new(
            id,
            format!("p{id}"),
            Color::default(),
            ControlledBy::Human,
            pos,
            &Config::default(),
            0.0,
        );
        world.add_player(player)
    }

    #[test]
    fn test_remove_player_drops_projectiles() {
        let mut w = world();
        let a = add(&mut w, Vec2::ZERO);
        let b = add(&mut w, Vec2::new(10.0, 0.0));
        let id = w.next_id();
        w.boomerangs.push(Boomerang::new(id, a, Vec2::ZERO, Vec2::X, 180.0, 3.0, 0.0));
        let id = w.next_id();
        w.boomerangs.push(Boomerang::new(id, b, Vec2::ZERO, Vec2::X, 180.0, 3.0, 0.0));

        assert!(w.remove_player(a).is_some());
        assert_eq!(w.boomerangs.len(), 1);
        assert_eq!(w.boomerangs[0].owner_id, b);
        assert_eq!(w.player_order, vec![b]);
        assert!(w.remove_player(a).is_none());
    }

    #[test]
    fn test_nearest_living_skips_dead_and_self() {
        let mut w = world();
        let me = add(&mut w, Vec2::ZERO);
        let near = add(&mut w, Vec2::new(5.0, 0.0));
        let far = add(&mut w, Vec2::new(50.0, 0.0));
        assert_eq!(w.nearest_living(Vec2::ZERO, me, f32::INFINITY).map(|n| n.0), Some(near));

        if let Some(p) = w.player_mut(near) {
            p.kill(0.0);
        }
        assert_eq!(w.nearest_living(Vec2::ZERO, me, f32::INFINITY).map(|n| n.0), Some(far));
        assert_eq!(w.nearest_living(Vec2::ZERO, me, 10.0), None);
    }

    #[test]
    fn test_circle_containment() {
        let border = WorldBorder::new(3000.0, 3000.0, Containment::Circle { radius: 100.0 });
        let p = border.contain(Vec2::new(200.0, 0.0), 10.0);
        assert!((p.x - 90.0).abs() < 1e-4);
        assert_eq!(border.contain(Vec2::new(10.0, 0.0), 10.0), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_rect_containment() {
        let border = WorldBorder::new(100.0, 100.0, Containment::Rect);
        assert_eq!(border.contain(Vec2::new(80.0, -80.0), 5.0), Vec2::new(45.0, -45.0));
    }

    #[test]
    fn test_clock_is_tick_derived() {
        let mut w = world();
        for _ in 0..60 {
            w.advance(1000.0 / 60.0);
        }
        assert_eq!(w.tick, 60);
        assert!((w.now - 1000.0).abs() < 1e-9);
    }
}
