//! Snapback game server library.

pub mod ai;
pub mod collision;
pub mod config;
pub mod economy;
pub mod entity;
pub mod error;
pub mod gamemodes;
pub mod math;
pub mod server;
pub mod snapshot;
pub mod systems;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use error::JoinError;
pub use server::{run, GameState, TargetedMessage, TargetedMessageType};
