//! Framed codec for LOFT packets over a byte stream.
//!
//! The decoder consumes a fixed header first, then waits for the full
//! payload before yielding a packet. A hard frame cap plus a
//! runtime-adjustable read limit guard against misbehaving peers; the
//! limit is shared through an atomic so it can be tightened while the
//! decoder is live (see [`Connection::set_read_limit`]).
//!
//! [`Connection::set_read_limit`]: crate::network::Connection::set_read_limit

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::LoftError;
use crate::header::{HEADER_LENGTH, PacketHeader};
use crate::message::PacketType;
use crate::packet::{MAX_FRAME_SIZE, Packet};

/// Encoder/decoder between [`Packet`]s and raw frames.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    /// Shared inbound frame limit in bytes; 0 means no limit beyond
    /// [`MAX_FRAME_SIZE`].
    limit: Arc<AtomicUsize>,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self::with_limit(Arc::new(AtomicUsize::new(0)))
    }

    /// Build a codec sharing an externally owned limit.
    pub fn with_limit(limit: Arc<AtomicUsize>) -> Self {
        Self { limit }
    }

    fn current_limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = LoftError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LENGTH {
            return Ok(None);
        }

        let header_bytes: [u8; HEADER_LENGTH] = src[..HEADER_LENGTH]
            .try_into()
            .expect("slice length checked");
        let header = PacketHeader::from_bytes(header_bytes)?;

        // Validate the type before buffering a whole payload for it.
        PacketType::try_from(header.packet_type())?;

        let frame_len = HEADER_LENGTH + header.payload_length() as usize;
        if frame_len > MAX_FRAME_SIZE {
            return Err(LoftError::PacketTooLarge {
                size: frame_len,
                limit: MAX_FRAME_SIZE,
            });
        }
        let limit = self.current_limit();
        if limit > 0 && frame_len > limit {
            return Err(LoftError::PacketTooLarge {
                size: frame_len,
                limit,
            });
        }

        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        let packet = Packet::from_bytes(&frame)?;
        packet.verify()?;
        Ok(Some(packet))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = LoftError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = item.to_bytes();
        dst.reserve(frame.len());
        dst.extend_from_slice(&frame);
        Ok(())
    }
}
