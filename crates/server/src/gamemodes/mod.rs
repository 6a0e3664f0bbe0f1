use crate::config::{Config, ModeKind};
use crate::world::{Containment, World};
use glam::Vec2;
use protocol::packets::RoundView;

pub mod arena;
pub mod ffa;

/// Per-variant rules consulted by the tick systems.
pub trait GameMode: Send + Sync {
    fn name(&self) -> &str;
    /// Wire id sent in Welcome.
    fn id(&self) -> u8;

    fn containment(&self, config: &Config) -> Containment;

    /// Throws lock onto the nearest enemy instead of following the aim angle.
    fn auto_aim(&self, config: &Config) -> bool;

    /// Bots blend a separation force into their steering.
    fn crowd_separation(&self) -> bool {
        false
    }

    /// Food pellets exist and mass decays.
    fn food_enabled(&self) -> bool {
        false
    }

    /// Dropped coins expire after this long; `None` keeps them until picked up.
    fn coin_lifetime_ms(&self, _config: &Config) -> Option<f64> {
        None
    }

    /// Dead players are removed once their linger window passes.
    fn removes_dead(&self) -> bool {
        true
    }

    /// Whether throws are accepted right now.
    fn allows_throw(&self) -> bool {
        true
    }

    /// Whether a player joining now enters alive, or spectates until the next round.
    fn joins_alive(&self) -> bool {
        true
    }

    /// Hit, elimination and winner events are broadcast to every client.
    fn announces_rounds(&self) -> bool {
        false
    }

    fn spawn_position(&self, world: &World, config: &Config) -> Vec2;

    /// Called once at the end of every tick.
    fn on_tick(&mut self, _world: &mut World, _config: &Config) {}

    fn round_view(&self, _now: f64) -> Option<RoundView> {
        None
    }
}

pub fn get_gamemode(kind: ModeKind) -> Box<dyn GameMode> {
    match kind {
        ModeKind::Arena => Box::new(arena::Arena::new()),
        ModeKind::Ffa => Box::new(ffa::Ffa::new()),
    }
}
