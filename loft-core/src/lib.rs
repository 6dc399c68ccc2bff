//! # loft-core
//!
//! Transport and session core for the LOFT publish/subscribe protocol.
//!
//! This crate contains:
//! - **Protocol types**: `PacketHeader`, `Packet`, `PacketType`
//! - **Protocol payloads**: `ConnectRequest`, `ConnectAck`, `Publish`
//! - **Codec**: `PacketCodec` for framed byte-stream I/O via `tokio_util`
//! - **Network**: `Connection` — packet transport with batched async
//!   flushing, read deadlines and error latching
//! - **Completion**: `Completion` — a cancelable, timeout-bounded
//!   one-shot signal for request/response flows
//! - **Session**: keep-alive state machine and broker-side session
//!   driver, plus the `Backend` seam it consumes
//! - **Error**: `LoftError` — typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod completion;
pub mod error;
pub mod header;
pub mod message;
pub mod network;
pub mod packet;
pub mod protocol;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::PacketCodec;
pub use completion::Completion;
pub use error::LoftError;
pub use header::{HEADER_LENGTH, PacketHeader};
pub use message::PacketType;
pub use network::{Carrier, Connection, FLUSH_DELAY};
pub use packet::{MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, Packet};
pub use protocol::{ConnectAck, ConnectRequest, Publish, ReturnCode};
pub use session::{Backend, Session, SessionConfig, SessionPhase};
