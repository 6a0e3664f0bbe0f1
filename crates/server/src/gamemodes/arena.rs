//! Arena game mode.
//!
//! Circular arena with last-player-standing rounds: waiting lobby, warmup,
//! active round and a short winner display before the next warmup.

use super::GameMode;
use crate::config::Config;
use crate::world::{Containment, World};
use glam::Vec2;
use protocol::packets::{RoundEvent, RoundPhase, RoundView};
use std::f32::consts::{PI, TAU};
use tracing::info;

/// Arena game mode.
pub struct Arena {
    /// Current phase.
    pub phase: RoundPhase,
    /// Simulation time the current phase ends at, if it is timed.
    pub phase_ends_at: Option<f64>,
    /// Survivor of the last finished round.
    pub winner: Option<u32>,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Waiting,
            phase_ends_at: None,
            winner: None,
        }
    }

    fn deadline_passed(&self, now: f64) -> bool {
        self.phase_ends_at.is_some_and(|at| now >= at)
    }

    /// Place everyone evenly on the spawn circle facing the center, alive and armed.
    fn reset_players(world: &mut World, config: &Config) {
        let ids = world.player_order.clone();
        let step = if ids.is_empty() { 0.0 } else { TAU / ids.len() as f32 };
        let now = world.now;
        for (i, id) in ids.into_iter().enumerate() {
            let angle = step * i as f32;
            let pos = Vec2::new(angle.cos(), angle.sin()) * config.world.spawn_radius;
            if let Some(player) = world.player_mut(id) {
                player.revive(pos, angle + PI, now);
            }
        }
        world.boomerangs.clear();
    }

    fn start_warmup(&mut self, world: &mut World, config: &Config) {
        Self::reset_players(world, config);
        self.phase = RoundPhase::Warmup;
        self.phase_ends_at = Some(world.now + config.round.warmup_ms);
        self.winner = None;
        info!("Arena: warmup with {} players", world.player_count());
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for Arena {
    fn name(&self) -> &str {
        "Arena"
    }

    fn id(&self) -> u8 {
        1
    }

    fn containment(&self, config: &Config) -> Containment {
        Containment::Circle {
            radius: config.world.arena_radius,
        }
    }

    fn auto_aim(&self, config: &Config) -> bool {
        config.boomerang.auto_aim.unwrap_or(true)
    }

    fn removes_dead(&self) -> bool {
        false
    }

    fn allows_throw(&self) -> bool {
        matches!(self.phase, RoundPhase::Waiting | RoundPhase::Active)
    }

    fn joins_alive(&self) -> bool {
        matches!(self.phase, RoundPhase::Waiting | RoundPhase::Warmup)
    }

    fn announces_rounds(&self) -> bool {
        true
    }

    fn spawn_position(&self, world: &World, config: &Config) -> Vec2 {
        world.border.random_position(config.world.arena_radius * 0.25)
    }

    fn on_tick(&mut self, world: &mut World, config: &Config) {
        let now = world.now;

        if world.player_count() < 2 {
            if let Some(&id) = world.player_order.first() {
                let was_waiting = self.phase == RoundPhase::Waiting;
                if let Some(player) = world.player_mut(id)
                    && (!player.is_alive() || !was_waiting)
                {
                    player.revive(Vec2::ZERO, 0.0, now);
                }
            } else {
                world.boomerangs.clear();
            }
            self.phase = RoundPhase::Waiting;
            self.phase_ends_at = None;
            self.winner = None;
            return;
        }

        match self.phase {
            RoundPhase::Waiting => self.start_warmup(world, config),
            RoundPhase::Warmup => {
                if self.deadline_passed(now) {
                    self.phase = RoundPhase::Active;
                    self.phase_ends_at = None;
                    info!("Arena: round started");
                }
            }
            RoundPhase::Active => {
                let mut survivors: Vec<(u32, String)> =
                    world.living().take(2).map(|p| (p.id, p.name.clone())).collect();
                if survivors.len() < 2 {
                    let (winner_id, name) = match survivors.pop() {
                        Some((id, name)) => (Some(id), name),
                        None => (None, String::new()),
                    };
                    match &winner_id {
                        Some(_) => info!("Arena: {} wins the round", name),
                        None => info!("Arena: round ended with no survivor"),
                    }
                    self.phase = RoundPhase::RoundEnd;
                    self.phase_ends_at = Some(now + config.round.round_end_ms);
                    self.winner = winner_id;
                    world.round_events.push(RoundEvent::Winner { winner_id, name });
                }
            }
            RoundPhase::RoundEnd => {
                if self.deadline_passed(now) {
                    self.start_warmup(world, config);
                }
            }
        }
    }

    fn round_view(&self, now: f64) -> Option<RoundView> {
        let time_left_ms = self
            .phase_ends_at
            .map(|at| (at - now).max(0.0).round() as u32)
            .unwrap_or(0);
        Some(RoundView {
            phase: self.phase,
            time_left_ms,
            last_winner: self.winner,
        })
    }
}
