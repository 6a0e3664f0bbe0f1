//! Bot players.

pub mod bot_manager;
pub mod bot_player;

pub use bot_manager::BotManager;
pub use bot_player::{BotBrain, BotMode};
