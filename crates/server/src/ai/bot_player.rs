use crate::config::Config;
use crate::entity::{Body, InputFrame, Player};
use crate::math::{from_angle, lerp_angle, normalize_or_zero, perp};
use crate::world::World;
use glam::Vec2;
use rand::Rng;

/// Bot names, handed out in order.
pub const BOT_NAMES: &[&str] = &[
    "Blaze", "Frost", "Spike", "Viper", "Nova", "Shade", "Bolt", "Fang", "Echo", "Raze", "Drift",
    "Jinx", "Storm", "Glitch", "Neon",
];

/// Distance under which a fighting bot may dash at its target.
const DASH_ENGAGE_DISTANCE: f32 = 40.0;

/// Distance at which a bot starts picking fights. With auto-aim the throw
/// locks onto anyone inside `lock_radius`, so bots close in from there.
pub fn engage_range(config: &Config, auto_aim: bool) -> f32 {
    if auto_aim {
        config.boomerang.lock_radius
    } else {
        config.boomerang.max_distance * 1.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMode {
    Wander,
    Idle,
    Fight,
}

/// Decision state for one bot-controlled player.
///
/// The brain never touches the world; each tick it reads it and produces an
/// input frame, exactly what a human client would send.
#[derive(Debug, Clone)]
pub struct BotBrain {
    /// Id of the player this brain drives.
    pub id: u32,
    pub aggression: f32,
    /// Facing turn rate in radians per second.
    pub turn_speed: f32,
    pub speed_mult: f32,
    pub mode: BotMode,
    pub(crate) mode_timer: f32,
    pub(crate) action_timer: f32,
    pub(crate) think_timer: f32,
    pub(crate) shoot_cooldown: f32,
    pub(crate) retreat_timer: f32,
    pub(crate) hesitate: f32,
    strafe_dir: f32,
    wander_angle: f32,
    aim_noise: f32,
    facing: f32,
}

impl BotBrain {
    pub fn new(id: u32) -> Self {
        let mut rng = rand::rng();
        let wander_angle = rng.random_range(0.0..std::f32::consts::TAU);
        Self {
            id,
            aggression: rng.random_range(0.3..1.0),
            turn_speed: rng.random_range(3.0..6.0),
            speed_mult: rng.random_range(0.7..1.0),
            mode: BotMode::Wander,
            mode_timer: rng.random_range(1.0..4.0),
            action_timer: 0.0,
            think_timer: 0.0,
            shoot_cooldown: 0.0,
            retreat_timer: 0.0,
            hesitate: 0.0,
            strafe_dir: 1.0,
            wander_angle,
            aim_noise: 0.0,
            facing: wander_angle,
        }
    }

    /// Perpendicular escape from the closest threatening boomerang, plus
    /// whether it is close enough to dash.
    fn dodge(&self, me: &Player, world: &World, config: &Config) -> Option<(Vec2, bool)> {
        let radius = me.radius();
        for b in &world.boomerangs {
            if b.owner_id == self.id || b.is_returning() {
                continue;
            }
            let to_bot = me.position - b.position;
            let d = to_bot.length();
            if d >= radius * config.bots.danger_factor || to_bot.dot(b.direction) <= 0.0 {
                continue;
            }
            let side = perp(b.direction);
            let escape = if side.dot(to_bot) > 0.0 { side } else { -side };
            return Some((escape, d < radius * config.bots.dash_danger_factor));
        }
        None
    }

    fn roll_mode(&mut self, nearest_dist: Option<f32>, engage: f32, rng: &mut impl Rng) {
        let roll: f32 = rng.random();
        if nearest_dist.is_some_and(|d| d < engage) && roll < self.aggression {
            self.mode = BotMode::Fight;
            self.mode_timer = rng.random_range(1.5..4.0);
        } else if roll < 0.15 {
            self.mode = BotMode::Idle;
            self.mode_timer = rng.random_range(0.5..2.0);
            self.hesitate = self.mode_timer;
        } else {
            self.mode = BotMode::Wander;
            self.mode_timer = rng.random_range(2.0..6.0);
            self.wander_angle += rng.random_range(-1.0..1.0);
        }
        self.strafe_dir = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    }

    /// Decide this tick's input. `None` when the bot's player is gone or dead.
    pub fn think(&mut self, world: &World, config: &Config, engage: f32, dt: f32) -> Option<InputFrame> {
        let me = world.player(self.id).filter(|p| p.is_alive())?;
        let mut rng = rand::rng();
        let now = world.now;

        self.mode_timer -= dt;
        self.action_timer -= dt;
        self.think_timer -= dt;
        self.shoot_cooldown -= dt;
        self.retreat_timer -= dt;
        if self.hesitate > 0.0 {
            self.hesitate -= dt;
        }

        if let Some((escape, dash)) = self.dodge(me, world, config) {
            return Some(InputFrame {
                move_dir: escape,
                aim_angle: self.facing,
                shoot: false,
                dash,
            });
        }

        let nearest = world
            .nearest_living(me.position, self.id, f32::INFINITY)
            .and_then(|(id, d)| world.player(id).map(|p| (p.position, d)));
        let range = config.boomerang.max_distance;
        let preferred = config.bots.preferred_range;
        let immune = me.is_immune(now, config.player.spawn_immunity_ms);

        if self.mode_timer <= 0.0 {
            self.roll_mode(nearest.map(|n| n.1), engage, &mut rng);
        }
        if self.mode == BotMode::Wander
            && nearest.is_some_and(|n| n.1 < range * 0.6)
            && rng.random::<f32>() < self.aggression * 0.3
        {
            self.mode = BotMode::Fight;
        }

        let mut goal = Vec2::ZERO;
        let mut speed = self.speed_mult;
        let mut shot_angle = None;
        let mut dash = false;

        let goal_angle = match nearest {
            Some((target, _)) if self.mode == BotMode::Idle || self.hesitate > 0.0 => {
                speed = 0.1;
                let to = target - me.position;
                to.y.atan2(to.x)
            }
            Some((target, dist)) if self.mode == BotMode::Fight && dist > 0.0 => {
                let to = (target - me.position) / dist;
                let raw_aim = to.y.atan2(to.x);

                if self.think_timer <= 0.0 {
                    self.aim_noise = rng.random_range(-0.2..0.2);
                    self.think_timer = rng.random_range(0.15..0.35);
                }

                let in_range = dist < range + me.radius();
                if in_range && me.has_projectile && self.shoot_cooldown <= 0.0 && !immune {
                    self.shoot_cooldown = rng.random_range(0.8..2.0);
                    self.retreat_timer = rng.random_range(0.3..0.8);
                    shot_angle = Some(raw_aim + self.aim_noise * 0.5);
                }

                let side = perp(to) * self.strafe_dir;
                goal = if self.retreat_timer > 0.0 {
                    -to + side * 0.6
                } else if !me.has_projectile {
                    speed *= 0.85;
                    let base = if dist < preferred * 0.8 {
                        -to * 0.5
                    } else {
                        from_angle(self.wander_angle) * 0.6
                    };
                    base + side * 0.4
                } else if dist > range * 0.9 {
                    from_angle(raw_aim + self.aim_noise * 0.6)
                } else if dist < preferred * 0.5 {
                    -to * 0.5 + side * 0.7
                } else {
                    if self.action_timer <= 0.0 {
                        self.strafe_dir = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                        self.action_timer = rng.random_range(1.0..2.5);
                        if rng.random::<f32>() < 0.2 {
                            self.hesitate = rng.random_range(0.2..0.5);
                        }
                    }
                    let approach = if dist < preferred { -0.15 } else { 0.2 };
                    perp(to) * self.strafe_dir * 0.7 + to * approach
                };

                let off_cooldown = me
                    .last_dash_at
                    .is_none_or(|at| now - at >= config.dash.cooldown_ms);
                if off_cooldown && !immune && dist < DASH_ENGAGE_DISTANCE && rng.random::<f32>() < 0.01 {
                    dash = true;
                }
                raw_aim
            }
            _ => {
                if self.action_timer <= 0.0 {
                    self.wander_angle += rng.random_range(-0.5..0.5);
                    self.action_timer = rng.random_range(1.5..4.0);
                }
                let coin = world
                    .coins
                    .iter()
                    .map(|c| (c.position, c.position.distance(me.position)))
                    .filter(|(_, d)| *d < config.bots.coin_attraction_radius)
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                match coin {
                    Some((pos, _)) => {
                        goal = pos - me.position;
                        goal.y.atan2(goal.x)
                    }
                    None => {
                        goal = from_angle(self.wander_angle);
                        speed *= 0.6;
                        self.wander_angle
                    }
                }
            }
        };

        self.facing = lerp_angle(self.facing, goal_angle, (self.turn_speed * dt).min(1.0));
        Some(InputFrame {
            move_dir: normalize_or_zero(goal) * speed.min(1.0),
            aim_angle: shot_angle.unwrap_or(self.facing),
            shoot: shot_angle.is_some(),
            dash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Boomerang, ControlledBy};
    use crate::systems::testing::{quiet_config, spawn, world};

    fn bot_at(w: &mut World, config: &Config, pos: Vec2) -> u32 {
        let id = spawn(w, config, pos);
        w.player_mut(id).unwrap().controlled_by = ControlledBy::Bot;
        id
    }

    #[test]
    fn test_dodge_preempts_and_dashes_when_close() {
        let config = quiet_config();
        let mut w = world(&config);
        let bot = bot_at(&mut w, &config, Vec2::ZERO);
        let enemy = spawn(&mut w, &config, Vec2::new(-100.0, 0.0));
        let id = w.next_id();
        w.boomerangs
            .push(Boomerang::new(id, enemy, Vec2::new(-15.0, 0.0), Vec2::X, 180.0, 3.0, 0.0));

        let mut brain = BotBrain::new(bot);
        let frame = brain.think(&w, &config, engage_range(&config, false), 1.0 / 60.0).unwrap();
        assert!(frame.move_dir.x.abs() < 1e-6);
        assert!((frame.move_dir.y.abs() - 1.0).abs() < 1e-6);
        assert!(frame.dash);
        assert!(!frame.shoot);
    }

    #[test]
    fn test_receding_boomerang_ignored() {
        let config = quiet_config();
        let mut w = world(&config);
        let bot = bot_at(&mut w, &config, Vec2::ZERO);
        let enemy = spawn(&mut w, &config, Vec2::new(-100.0, 0.0));
        let id = w.next_id();
        w.boomerangs
            .push(Boomerang::new(id, enemy, Vec2::new(15.0, 0.0), Vec2::X, 180.0, 3.0, 0.0));

        let mut brain = BotBrain::new(bot);
        brain.mode = BotMode::Idle;
        brain.mode_timer = 10.0;
        brain.hesitate = 10.0;
        let frame = brain.think(&w, &config, engage_range(&config, false), 1.0 / 60.0).unwrap();
        assert!(!frame.dash);
        assert!(frame.move_dir.length() <= 0.1 + 1e-6);
    }

    #[test]
    fn test_fighting_bot_shoots_in_range() {
        let config = quiet_config();
        let mut w = world(&config);
        let bot = bot_at(&mut w, &config, Vec2::ZERO);
        spawn(&mut w, &config, Vec2::new(0.0, 50.0));

        let mut brain = BotBrain::new(bot);
        brain.mode = BotMode::Fight;
        brain.mode_timer = 10.0;
        let frame = brain.think(&w, &config, engage_range(&config, false), 1.0 / 60.0).unwrap();
        assert!(frame.shoot);
        assert!((frame.aim_angle - std::f32::consts::FRAC_PI_2).abs() <= 0.1 + 1e-6);
        assert!(brain.shoot_cooldown >= 0.8);

        // Cooling down: no second throw on the next tick.
        let frame = brain.think(&w, &config, engage_range(&config, false), 1.0 / 60.0).unwrap();
        assert!(!frame.shoot);
    }

    #[test]
    fn test_auto_aim_widens_fight_range() {
        let config = quiet_config();
        let mut rng = rand::rng();
        let mut brain = BotBrain::new(1);
        brain.aggression = 1.0;

        // Beyond a free throw's reach but inside the auto-aim lock.
        let dist = Some(180.0);
        brain.roll_mode(dist, engage_range(&config, false), &mut rng);
        assert_ne!(brain.mode, BotMode::Fight);
        brain.roll_mode(dist, engage_range(&config, true), &mut rng);
        assert_eq!(brain.mode, BotMode::Fight);
    }

    #[test]
    fn test_dead_bot_has_no_input() {
        let config = quiet_config();
        let mut w = world(&config);
        let bot = bot_at(&mut w, &config, Vec2::ZERO);
        w.player_mut(bot).unwrap().kill(0.0);
        assert!(BotBrain::new(bot).think(&w, &config, engage_range(&config, false), 1.0 / 60.0).is_none());
    }
}
