use super::bot_player::{engage_range, BotBrain, BOT_NAMES};
use crate::config::Config;
use crate::entity::{ControlledBy, LifeState, Player};
use crate::gamemodes::GameMode;
use crate::world::{ColorCycle, World};
use tracing::debug;

/// Owns the brains of every bot and keeps the bot population in line with
/// the number of humans.
#[derive(Debug, Default)]
pub struct BotManager {
    /// Active bots.
    pub brains: Vec<BotBrain>,
    /// Next name to hand out.
    next_name: usize,
}

impl BotManager {
    /// Create a new bot manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bots wanted for `humans` connected players.
    pub fn target_count(config: &Config, humans: usize) -> usize {
        if !config.bots.enabled {
            return 0;
        }
        let room = config.server.max_players_per_arena.saturating_sub(humans);
        config.bots.fill_players.saturating_sub(humans).min(room)
    }

    /// Add or remove bots until the population matches `target_count`.
    ///
    /// Brains whose player has been removed from the world are dropped first.
    pub fn sync(
        &mut self,
        world: &mut World,
        config: &Config,
        mode: &dyn GameMode,
        colors: &mut ColorCycle,
    ) {
        self.brains.retain(|b| world.player(b.id).is_some());
        let target = Self::target_count(config, world.human_count());

        while self.brains.len() < target {
            let id = self.spawn_bot(world, config, mode, colors);
            debug!("Added bot {}", id);
        }
        while self.brains.len() > target {
            let Some(brain) = self.brains.pop() else { break };
            world.remove_player(brain.id);
            debug!("Removed bot {}", brain.id);
        }
    }

    fn spawn_bot(
        &mut self,
        world: &mut World,
        config: &Config,
        mode: &dyn GameMode,
        colors: &mut ColorCycle,
    ) -> u32 {
        let id = world.next_id();
        let name = BOT_NAMES[self.next_name % BOT_NAMES.len()].to_string();
        self.next_name = self.next_name.wrapping_add(1);

        let position = mode.spawn_position(world, config);
        let mut player = Player::new(
            id,
            name,
            colors.next_color(),
            ControlledBy::Bot,
            position,
            config,
            world.now,
        );
        if !mode.joins_alive() {
            player.life = LifeState::Dead { died_at: world.now };
        }
        world.add_player(player);
        self.brains.push(BotBrain::new(id));
        id
    }

    /// Run every brain and feed its decision into the bot's input frame.
    pub fn update(&mut self, world: &mut World, config: &Config, mode: &dyn GameMode) {
        let dt = config.dt();
        let engage = engage_range(config, mode.auto_aim(config));
        for brain in &mut self.brains {
            let Some(frame) = brain.think(world, config, engage, dt) else { continue };
            if let Some(player) = world.player_mut(brain.id) {
                player.input.move_dir = frame.move_dir;
                player.input.aim_angle = frame.aim_angle;
                player.input.shoot |= frame.shoot;
                player.input.dash |= frame.dash;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamemodes::ffa::Ffa;
    use crate::systems::testing::{spawn, world};

    #[test]
    fn test_fill_target() {
        let mut config = Config::default();
        config.bots.fill_players = 4;
        config.server.max_players_per_arena = 3;
        assert_eq!(BotManager::target_count(&config, 0), 3);
        assert_eq!(BotManager::target_count(&config, 2), 1);
        assert_eq!(BotManager::target_count(&config, 5), 0);
        config.bots.enabled = false;
        assert_eq!(BotManager::target_count(&config, 0), 0);
    }

    #[test]
    fn test_sync_adds_and_removes() {
        let mut config = Config::default();
        config.bots.fill_players = 2;
        let mut w = world(&config);
        let mut bots = BotManager::new();
        let mut colors = ColorCycle::default();
        let mode = Ffa::new();

        bots.sync(&mut w, &config, &mode, &mut colors);
        assert_eq!(bots.brains.len(), 2);
        assert_eq!(w.player_count(), 2);
        assert!(w.players().all(|p| p.is_bot()));

        spawn(&mut w, &config, glam::Vec2::ZERO);
        bots.sync(&mut w, &config, &mode, &mut colors);
        assert_eq!(bots.brains.len(), 1);
        assert_eq!(w.player_count(), 2);

        // A reaped bot is replaced.
        let gone = bots.brains[0].id;
        w.remove_player(gone);
        bots.sync(&mut w, &config, &mode, &mut colors);
        assert_eq!(bots.brains.len(), 1);
        assert_ne!(bots.brains[0].id, gone);
    }
}
