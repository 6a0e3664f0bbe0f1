//! Player action errors.

use crate::economy::EconomyError;
use thiserror::Error;

/// Why a join, cash-out or balance request was refused.
///
/// Every variant is reported to the requesting connection only.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JoinError {
    #[error("Arena is full ({max} players)")]
    ArenaFull { max: usize },

    #[error("Already in the arena")]
    AlreadyJoined,

    #[error("Not in the arena")]
    NotInArena,

    #[error("No account attached to this session")]
    NoAccount,

    #[error("Connection is not registered")]
    NotConnected,

    #[error(transparent)]
    Economy(#[from] EconomyError),
}
