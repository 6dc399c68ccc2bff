//! Domain-specific error types for the LOFT protocol.
//!
//! All fallible operations return `Result<T, LoftError>`.
//! No panics on invalid input — every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the LOFT protocol.
#[derive(Debug, Error)]
pub enum LoftError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// Received bytes that do not start with a valid LOFT magic sequence.
    #[error("invalid magic bytes: expected LFT0")]
    InvalidMagic,

    /// A field in the packet header could not be parsed.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// The packet payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// A packet violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Packet Errors ────────────────────────────────────────────
    /// The payload exceeds the configured maximum size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The received frame is shorter or longer than expected.
    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidPacketLength { expected: usize, actual: usize },

    /// An inbound packet exceeded the connection's read limit.
    #[error("packet too large: {size} bytes (limit {limit})")]
    PacketTooLarge { size: usize, limit: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The underlying carrier reported an I/O error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The connection was closed; no further sends or receives succeed.
    #[error("connection closed")]
    ConnectionClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<Box<bincode::ErrorKind>> for LoftError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        LoftError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = LoftError::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = LoftError::PayloadTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = LoftError::Timeout(Duration::from_millis(10));
        assert!(e.to_string().contains("timeout"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: LoftError = io_err.into();
        assert!(matches!(e, LoftError::Connection(_)));
    }

    #[test]
    fn from_bincode() {
        let res: Result<u64, _> = bincode::deserialize(&[0u8; 2]);
        let e: LoftError = res.unwrap_err().into();
        assert!(matches!(e, LoftError::Encoding(_)));
    }
}
