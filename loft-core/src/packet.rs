//! The LOFT packet — a typed header plus an opaque payload.

use std::fmt::Debug;

use crate::error::LoftError;
use crate::header::{HEADER_LENGTH, PacketHeader};
use crate::message::PacketType;
use crate::protocol::{ConnectAck, ConnectRequest, Publish};

/// Maximum payload size accepted by constructors and the parser.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Maximum encoded frame size (header + payload).
pub const MAX_FRAME_SIZE: usize = HEADER_LENGTH + MAX_PAYLOAD_SIZE;

/// One protocol packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: PacketHeader,
    payload: Vec<u8>,
}

/// Truncated blake3 hash of the payload; 0 for empty payloads.
fn payload_checksum(payload: &[u8]) -> u32 {
    if payload.is_empty() {
        return 0;
    }
    let hash = blake3::hash(payload);
    u32::from_le_bytes(hash.as_bytes()[0..4].try_into().expect("hash is 32 bytes"))
}

impl Packet {
    fn build(packet_type: PacketType, packet_id: u64, payload: Vec<u8>) -> Result<Self, LoftError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(LoftError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let header = PacketHeader::new(
            payload_checksum(&payload),
            packet_type as u32,
            packet_id,
            payload.len() as u64,
        );
        Ok(Self { header, payload })
    }

    // ── Constructors ─────────────────────────────────────────────

    /// Build a handshake request packet.
    pub fn connect(request: &ConnectRequest) -> Result<Self, LoftError> {
        Self::build(PacketType::Connect, 0, request.to_bytes()?)
    }

    /// Build a handshake acknowledgment packet.
    pub fn connack(ack: &ConnectAck) -> Result<Self, LoftError> {
        Self::build(PacketType::ConnAck, 0, ack.to_bytes()?)
    }

    /// Build an application publish packet.
    pub fn publish(packet_id: u64, publish: &Publish) -> Result<Self, LoftError> {
        Self::build(PacketType::Publish, packet_id, publish.to_bytes()?)
    }

    /// Build a keep-alive ping request.
    pub fn ping() -> Self {
        Self {
            header: PacketHeader::new(0, PacketType::PingReq as u32, 0, 0),
            payload: Vec::new(),
        }
    }

    /// Build a keep-alive ping response.
    pub fn pong() -> Self {
        Self {
            header: PacketHeader::new(0, PacketType::PingResp as u32, 0, 0),
            payload: Vec::new(),
        }
    }

    /// Build a clean-disconnect packet.
    pub fn disconnect() -> Self {
        Self {
            header: PacketHeader::new(0, PacketType::Disconnect as u32, 0, 0),
            payload: Vec::new(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn packet_type(&self) -> Result<PacketType, LoftError> {
        PacketType::try_from(self.header.packet_type())
    }

    pub fn packet_id(&self) -> u64 {
        self.header.packet_id()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload as a handshake request.
    pub fn connect_request(&self) -> Result<ConnectRequest, LoftError> {
        if self.packet_type()? != PacketType::Connect {
            return Err(LoftError::ProtocolViolation("not a Connect packet"));
        }
        ConnectRequest::from_bytes(&self.payload)
    }

    /// Decode the payload as a handshake acknowledgment.
    pub fn connect_ack(&self) -> Result<ConnectAck, LoftError> {
        if self.packet_type()? != PacketType::ConnAck {
            return Err(LoftError::ProtocolViolation("not a ConnAck packet"));
        }
        ConnectAck::from_bytes(&self.payload)
    }

    /// Decode the payload as an application publish.
    pub fn publish_payload(&self) -> Result<Publish, LoftError> {
        if self.packet_type()? != PacketType::Publish {
            return Err(LoftError::ProtocolViolation("not a Publish packet"));
        }
        Publish::from_bytes(&self.payload)
    }

    // ── Wire form ────────────────────────────────────────────────

    /// Serialize header + payload into one frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut frame = self.header.to_bytes().to_vec();
        frame.extend_from_slice(&self.payload);
        frame
    }

    /// Parse one exact frame (header + payload, nothing more).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoftError> {
        if bytes.len() < HEADER_LENGTH {
            return Err(LoftError::InvalidPacketLength {
                expected: HEADER_LENGTH,
                actual: bytes.len(),
            });
        }

        let header_bytes = bytes[0..HEADER_LENGTH]
            .try_into()
            .expect("slice length checked");
        let header = PacketHeader::from_bytes(header_bytes)?;

        let payload_length = header.payload_length() as usize;
        if payload_length > MAX_PAYLOAD_SIZE {
            return Err(LoftError::PayloadTooLarge {
                size: payload_length,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let expected = HEADER_LENGTH + payload_length;
        if bytes.len() != expected {
            return Err(LoftError::InvalidPacketLength {
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            header,
            payload: bytes[HEADER_LENGTH..].to_vec(),
        })
    }

    /// Verify the payload against the header checksum.
    pub fn verify(&self) -> Result<(), LoftError> {
        if payload_checksum(&self.payload) != self.header.checksum() {
            return Err(LoftError::ChecksumMismatch);
        }
        Ok(())
    }
}
