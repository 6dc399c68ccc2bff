//! Structured protocol payloads.
//!
//! Each sub-module defines the payloads for one protocol exchange
//! (handshake, application publish). Payloads are serialized with
//! `serde` + `bincode` and carried inside [`Packet`] bodies.
//!
//! [`Packet`]: crate::packet::Packet

pub mod connect;
pub mod publish;

pub use connect::{ConnectAck, ConnectRequest, ReturnCode};
pub use publish::Publish;
