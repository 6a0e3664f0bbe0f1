//! Client -> Server packet parsing.

use crate::{BinaryReader, ProtocolError};

use super::ClientOpcode;

/// Longest display name accepted on the wire, in bytes.
pub const MAX_NAME_BYTES: usize = 64;
/// Longest user id / signature accepted on the wire, in bytes.
pub const MAX_TOKEN_BYTES: usize = 128;

const FLAG_SHOOT: u8 = 0x01;
const FLAG_DASH: u8 = 0x02;

/// Raw input payload as sent by a client.
///
/// Fields missing from a truncated packet decode as zero / false.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputPayload {
    pub seq: u32,
    pub move_x: f32,
    pub move_y: f32,
    pub aim_angle: f32,
    pub shoot: bool,
    pub dash: bool,
}

/// Parsed client packet.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    /// Join (0x01) with display name and optional ledger user id.
    Join { name: String, user_id: Option<String> },
    /// Input (0x02).
    Input(InputPayload),
    /// Cashout (0x03).
    Cashout,
    /// VerifyDeposit (0x04) with an external transaction signature.
    VerifyDeposit { signature: String },
    /// BalanceRequest (0x05).
    BalanceRequest,
}

impl ClientPacket {
    /// Parse a client packet from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let mut reader = BinaryReader::new(data.to_vec());
        let opcode = ClientOpcode::try_from(reader.get_u8()?)?;

        match opcode {
            ClientOpcode::Join => {
                let name = reader.get_string_utf8(MAX_NAME_BYTES)?;
                let user_id = if reader.remaining() > 0 {
                    Some(reader.get_string_utf8(MAX_TOKEN_BYTES)?).filter(|s| !s.is_empty())
                } else {
                    None
                };
                Ok(ClientPacket::Join { name, user_id })
            }
            ClientOpcode::Input => {
                let seq = reader.try_get_u32().unwrap_or(0);
                let move_x = reader.try_get_f32().unwrap_or(0.0);
                let move_y = reader.try_get_f32().unwrap_or(0.0);
                let aim_angle = reader.try_get_f32().unwrap_or(0.0);
                let flags = reader.try_get_u8().unwrap_or(0);
                Ok(ClientPacket::Input(InputPayload {
                    seq,
                    move_x,
                    move_y,
                    aim_angle,
                    shoot: flags & FLAG_SHOOT != 0,
                    dash: flags & FLAG_DASH != 0,
                }))
            }
            ClientOpcode::Cashout => Ok(ClientPacket::Cashout),
            ClientOpcode::VerifyDeposit => {
                let signature = reader.get_string_utf8(MAX_TOKEN_BYTES)?;
                Ok(ClientPacket::VerifyDeposit { signature })
            }
            ClientOpcode::BalanceRequest => Ok(ClientPacket::BalanceRequest),
        }
    }
}

/// Encode an input packet (used by bots in tests and by native clients).
pub fn build_input(input: &InputPayload) -> crate::BinaryWriter {
    let mut w = crate::BinaryWriter::with_capacity(18);
    w.put_u8(ClientOpcode::Input as u8);
    w.put_u32(input.seq);
    w.put_f32(input.move_x);
    w.put_f32(input.move_y);
    w.put_f32(input.aim_angle);
    let mut flags = 0u8;
    if input.shoot {
        flags |= FLAG_SHOOT;
    }
    if input.dash {
        flags |= FLAG_DASH;
    }
    w.put_u8(flags);
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryWriter;

    #[test]
    fn test_truncated_input_defaults() {
        let mut w = BinaryWriter::new();
        w.put_u8(0x02);
        w.put_u32(42);
        w.put_f32(1.0);
        let packet = ClientPacket::parse(w.as_slice()).unwrap();
        assert_eq!(
            packet,
            ClientPacket::Input(InputPayload {
                seq: 42,
                move_x: 1.0,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_input_flags() {
        let input = InputPayload {
            seq: 7,
            move_x: -1.0,
            move_y: 0.5,
            aim_angle: 3.0,
            shoot: true,
            dash: false,
        };
        let data = build_input(&input).finish();
        assert_eq!(ClientPacket::parse(&data), Ok(ClientPacket::Input(input)));
    }

    #[test]
    fn test_join_with_and_without_user() {
        let mut w = BinaryWriter::new();
        w.put_u8(0x01);
        w.put_string_utf8("Ana");
        assert_eq!(
            ClientPacket::parse(w.as_slice()),
            Ok(ClientPacket::Join { name: "Ana".into(), user_id: None })
        );

        w.put_string_utf8("user-9");
        assert_eq!(
            ClientPacket::parse(w.as_slice()),
            Ok(ClientPacket::Join { name: "Ana".into(), user_id: Some("user-9".into()) })
        );
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(ClientPacket::parse(&[0x7f]), Err(ProtocolError::InvalidOpcode(0x7f)));
        assert_eq!(ClientPacket::parse(&[]), Err(ProtocolError::Empty));
    }
}
