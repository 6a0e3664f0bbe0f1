//! Player record, shared by humans and bots.

use super::Body;
use crate::collision::mass_to_radius;
use crate::config::Config;
use crate::math::{finite_or_zero, normalize_or_zero};
use glam::Vec2;
use protocol::packets::InputPayload;
use protocol::Color;

/// Who produces this player's input frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlledBy {
    Human,
    Bot,
}

/// The latest intent for a player.
///
/// `shoot` and `dash` are sticky: once set they stay set until the
/// simulation consumes them, however many inputs arrive in between.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    /// Unit vector for humans; bots may steer with a shorter vector.
    pub move_dir: Vec2,
    pub aim_angle: f32,
    pub shoot: bool,
    pub dash: bool,
}

impl InputFrame {
    /// Merge a raw client payload into this frame.
    pub fn ingest(&mut self, payload: &InputPayload) {
        let raw = Vec2::new(finite_or_zero(payload.move_x), finite_or_zero(payload.move_y));
        self.move_dir = normalize_or_zero(raw);
        self.aim_angle = finite_or_zero(payload.aim_angle);
        self.shoot |= payload.shoot;
        self.dash |= payload.dash;
    }

    /// Take the shoot flag, clearing it.
    #[inline]
    pub fn take_shoot(&mut self) -> bool {
        std::mem::take(&mut self.shoot)
    }

    /// Take the dash flag, clearing it.
    #[inline]
    pub fn take_dash(&mut self) -> bool {
        std::mem::take(&mut self.dash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifeState {
    Alive,
    /// Excluded from physics and targeting until removed or revived.
    Dead { died_at: f64 },
}

/// A player in the arena.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub color: Color,
    pub controlled_by: ControlledBy,
    /// Ledger account, if the player paid an entry fee.
    pub user_id: Option<String>,

    pub position: Vec2,
    pub velocity: Vec2,
    mass: f32,
    radius: f32,
    /// Facing angle in radians.
    pub angle: f32,

    pub hp: u8,
    pub max_hp: u8,
    pub life: LifeState,
    pub has_projectile: bool,

    pub coins: u32,
    pub entry_fee_paid: f64,
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,

    /// Spawn immunity is measured from here.
    pub spawned_at: f64,
    pub last_dash_at: Option<f64>,
    pub last_throw_at: Option<f64>,
    /// Last time a projectile damaged this player.
    pub last_hit_at: Option<f64>,
    /// Regeneration fires `regen_interval_ms` after this.
    pub regen_from: f64,

    pub dashing: bool,
    pub dash_velocity: Vec2,
    pub dash_time_left_ms: f64,

    pub input: InputFrame,
    pub last_input_at: f64,
    pub last_seq: u32,
}

impl Player {
    /// Create a live player at `position`.
    pub fn new(
        id: u32,
        name: String,
        color: Color,
        controlled_by: ControlledBy,
        position: Vec2,
        config: &Config,
        now: f64,
    ) -> Self {
        let mass = config.player.initial_mass;
        Self {
            id,
            name,
            color,
            controlled_by,
            user_id: None,
            position,
            velocity: Vec2::ZERO,
            mass,
            radius: mass_to_radius(mass),
            angle: 0.0,
            hp: config.player.max_hp,
            max_hp: config.player.max_hp,
            life: LifeState::Alive,
            has_projectile: true,
            coins: config.economy.starting_coins,
            entry_fee_paid: 0.0,
            score: 0,
            kills: 0,
            deaths: 0,
            spawned_at: now,
            last_dash_at: None,
            last_throw_at: None,
            last_hit_at: None,
            regen_from: now,
            dashing: false,
            dash_velocity: Vec2::ZERO,
            dash_time_left_ms: 0.0,
            input: InputFrame::default(),
            last_input_at: now,
            last_seq: 0,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    #[inline]
    pub fn is_bot(&self) -> bool {
        self.controlled_by == ControlledBy::Bot
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Set mass and recompute the radius.
    #[inline]
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.radius = mass_to_radius(mass);
    }

    /// Inside the spawn immunity window.
    #[inline]
    pub fn is_immune(&self, now: f64, immunity_ms: f64) -> bool {
        now - self.spawned_at < immunity_ms
    }

    /// Apply damage, clamping at zero. Returns true when this hit was lethal.
    pub fn apply_damage(&mut self, damage: u8, now: f64) -> bool {
        self.hp = self.hp.saturating_sub(damage);
        self.last_hit_at = Some(now);
        self.regen_from = now;
        self.hp == 0
    }

    /// Heal, capped at max hp.
    #[inline]
    pub fn heal(&mut self, amount: u8) {
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
    }

    /// Mark dead and stop all motion.
    pub fn kill(&mut self, now: f64) {
        self.life = LifeState::Dead { died_at: now };
        self.deaths += 1;
        self.velocity = Vec2::ZERO;
        self.dashing = false;
        self.dash_time_left_ms = 0.0;
        self.input = InputFrame::default();
    }

    /// Bring the player back at `position` with full health and a projectile in hand.
    pub fn revive(&mut self, position: Vec2, angle: f32, now: f64) {
        self.life = LifeState::Alive;
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.angle = angle;
        self.hp = self.max_hp;
        self.has_projectile = true;
        self.dashing = false;
        self.dash_time_left_ms = 0.0;
        self.spawned_at = now;
        self.regen_from = now;
        self.input = InputFrame::default();
    }

    /// Milliseconds spent dead, if dead.
    #[inline]
    pub fn dead_for(&self, now: f64) -> Option<f64> {
        match self.life {
            LifeState::Alive => None,
            LifeState::Dead { died_at } => Some(now - died_at),
        }
    }
}

impl Body for Player {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(
            1,
            "Ana".into(),
            Color::default(),
            ControlledBy::Human,
            Vec2::ZERO,
            &Config::default(),
            0.0,
        )
    }

    #[test]
    fn test_sticky_flags_survive_later_input() {
        let mut frame = InputFrame::default();
        frame.ingest(&InputPayload {
            shoot: true,
            ..Default::default()
        });
        frame.ingest(&InputPayload {
            move_x: 3.0,
            move_y: 4.0,
            ..Default::default()
        });
        assert!(frame.shoot);
        assert!(!frame.dash);
        assert!((frame.move_dir - Vec2::new(0.6, 0.8)).length() < 1e-6);
        assert!(frame.take_shoot());
        assert!(!frame.shoot);
    }

    #[test]
    fn test_non_finite_input_is_zeroed() {
        let mut frame = InputFrame::default();
        frame.ingest(&InputPayload {
            move_x: f32::NAN,
            move_y: f32::INFINITY,
            aim_angle: f32::NAN,
            ..Default::default()
        });
        assert_eq!(frame.move_dir, Vec2::ZERO);
        assert_eq!(frame.aim_angle, 0.0);
    }

    #[test]
    fn test_damage_and_heal_clamp() {
        let mut p = player();
        assert!(!p.apply_damage(1, 10.0));
        assert_eq!(p.hp, 2);
        assert_eq!(p.last_hit_at, Some(10.0));
        assert!(p.apply_damage(3, 20.0));
        assert_eq!(p.hp, 0);
        p.heal(5);
        assert_eq!(p.hp, p.max_hp);
    }

    #[test]
    fn test_radius_follows_mass() {
        let mut p = player();
        p.set_mass(400.0);
        assert!((p.radius() - mass_to_radius(400.0)).abs() < 1e-6);
    }
}
