//! Tick systems.
//!
//! Each system is a plain function over the world, run strictly in the order
//! `GameState::tick` calls them: dash, movement, throw, flight, combat, reap,
//! then the passive systems.

pub mod combat;
pub mod dash;
pub mod input;
pub mod movement;
pub mod passive;
pub mod projectile;

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::Config;
    use crate::entity::{ControlledBy, Player};
    use crate::world::{Containment, World};
    use glam::Vec2;
    use protocol::Color;

    /// Config with immunity off and no bots, for deterministic scenarios.
    pub fn quiet_config() -> Config {
        let mut config = Config::default();
        config.player.spawn_immunity_ms = 0.0;
        config.bots.enabled = false;
        config
    }

    pub fn world(config: &Config) -> World {
        World::new(&config.world, Containment::Rect)
    }

    pub fn spawn(world: &mut World, config: &Config, pos: Vec2) -> u32 {
        let id = world.next_id();
        let player = Player::new(
            id,
            format!("p{id}"),
            Color::default(),
            ControlledBy::Human,
            pos,
            config,
            world.now,
        );
        world.add_player(player)
    }
}
