//! Packet definitions for the Snapback protocol.
//!
//! This module contains both client->server and server->client packet types.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Opcodes for client -> server packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOpcode {
    /// Join the arena with a display name.
    Join = 0x01,
    /// Movement, aim and one-shot action flags.
    Input = 0x02,
    /// Leave the arena and convert held coins to balance.
    Cashout = 0x03,
    /// Ask the server to verify an external deposit.
    VerifyDeposit = 0x04,
    /// Request the current ledger balance.
    BalanceRequest = 0x05,
}

impl TryFrom<u8> for ClientOpcode {
    type Error = crate::ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => ClientOpcode::Join,
            0x02 => ClientOpcode::Input,
            0x03 => ClientOpcode::Cashout,
            0x04 => ClientOpcode::VerifyDeposit,
            0x05 => ClientOpcode::BalanceRequest,
            _ => return Err(crate::ProtocolError::InvalidOpcode(value)),
        })
    }
}

/// Opcodes for server -> client packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOpcode {
    /// Join accepted: assigned id, rates and world bounds.
    Welcome = 0x10,
    /// Periodic world snapshot.
    Snapshot = 0x11,
    /// Sent to a human player when they die.
    Eliminated = 0x12,
    /// Arena hit / elimination / winner notifications.
    RoundEvent = 0x13,
    /// Typed rejection of a client action.
    Rejected = 0x14,
    /// Join refused because the arena is at capacity.
    ArenaFull = 0x15,
    /// Ledger balance.
    Balance = 0x16,
    /// Cashout result.
    CashedOut = 0x17,
    /// Outcome of a deposit verification.
    DepositResult = 0x18,
}
