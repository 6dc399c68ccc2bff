//! Protocol packet types.
//!
//! Uses proper enums with `TryFrom` — no panics on unknown values.

use crate::error::LoftError;
use std::fmt;

/// All packet types understood by the LOFT protocol.
///
/// Organized by category:
/// - `0x01..0x02` — Handshake (connect exchange)
/// - `0x03`       — Application traffic
/// - `0x0C..0x0E` — Session control (keep-alive, disconnect)
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Client handshake request; first packet on every connection.
    Connect = 0x01,
    /// Broker handshake acknowledgment.
    ConnAck = 0x02,
    /// Application message addressed to a topic.
    Publish = 0x03,
    /// Keep-alive ping request.
    PingReq = 0x0C,
    /// Keep-alive ping response.
    PingResp = 0x0D,
    /// Clean session shutdown.
    Disconnect = 0x0E,
}

impl TryFrom<u32> for PacketType {
    type Error = LoftError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(PacketType::Connect),
            0x02 => Ok(PacketType::ConnAck),
            0x03 => Ok(PacketType::Publish),
            0x0C => Ok(PacketType::PingReq),
            0x0D => Ok(PacketType::PingResp),
            0x0E => Ok(PacketType::Disconnect),
            _ => Err(LoftError::UnknownVariant {
                type_name: "PacketType",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::Connect => write!(f, "Connect"),
            PacketType::ConnAck => write!(f, "ConnAck"),
            PacketType::Publish => write!(f, "Publish"),
            PacketType::PingReq => write!(f, "PingReq"),
            PacketType::PingResp => write!(f, "PingResp"),
            PacketType::Disconnect => write!(f, "Disconnect"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_from_known_values() {
        assert_eq!(PacketType::try_from(0x01).unwrap(), PacketType::Connect);
        assert_eq!(PacketType::try_from(0x0C).unwrap(), PacketType::PingReq);
        assert_eq!(PacketType::try_from(0x0E).unwrap(), PacketType::Disconnect);
    }

    #[test]
    fn try_from_unknown_value() {
        let err = PacketType::try_from(0xFF).unwrap_err();
        assert!(matches!(err, LoftError::UnknownVariant { .. }));
    }

    #[test]
    fn display_names() {
        assert_eq!(PacketType::ConnAck.to_string(), "ConnAck");
        assert_eq!(PacketType::PingResp.to_string(), "PingResp");
    }
}
