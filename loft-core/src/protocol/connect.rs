//! Handshake payloads — the connect/ack exchange.
//!
//! # Wire Protocol
//!
//! ```text
//! Client ──[Connect]──────────────────────────► Broker
//!   Payload: ConnectRequest (bincode)
//!
//! Broker ──[ConnAck]──────────────────────────► Client
//!   Payload: ConnectAck (bincode)
//! ```
//!
//! The connect packet must be the first packet on every connection and
//! must arrive within the broker's connect timeout, otherwise the
//! carrier is closed without a reply.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LoftError;

// ── Connect ──────────────────────────────────────────────────────

/// Request payload for [`PacketType::Connect`].
///
/// [`PacketType::Connect`]: crate::message::PacketType::Connect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Identifier presented by the client; keys session-presence lookups.
    pub client_id: String,

    /// Optional login name.
    pub username: Option<String>,

    /// Optional login secret.
    pub password: Option<String>,

    /// Negotiated keep-alive interval in seconds (0 = no liveness check).
    pub keep_alive_secs: u16,

    /// Start from a fresh session, discarding any prior presence.
    pub clean_session: bool,
}

impl ConnectRequest {
    /// Create an anonymous connect request with defaults.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            username: None,
            password: None,
            keep_alive_secs: 0,
            clean_session: true,
        }
    }

    /// Set login credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the keep-alive interval in seconds.
    pub fn with_keep_alive(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    /// Request session resumption instead of a fresh session.
    pub fn with_resumed_session(mut self) -> Self {
        self.clean_session = false;
        self
    }

    /// The keep-alive interval as a duration.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    /// Serialize to bytes for packet payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LoftError> {
        bincode::serialize(self).map_err(LoftError::from)
    }

    /// Deserialize from packet payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoftError> {
        bincode::deserialize(bytes).map_err(LoftError::from)
    }
}

// ── ConnAck ──────────────────────────────────────────────────────

/// Outcome of a handshake attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReturnCode {
    /// Handshake accepted; the session is live.
    Accepted,
    /// Username/password rejected by the backend.
    BadCredentials,
    /// Authenticated but not permitted to connect.
    NotAuthorized,
}

/// Response payload for [`PacketType::ConnAck`].
///
/// [`PacketType::ConnAck`]: crate::message::PacketType::ConnAck
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectAck {
    /// Whether the handshake was accepted.
    pub return_code: ReturnCode,

    /// Whether the backend holds prior session state for this client.
    pub session_present: bool,
}

impl ConnectAck {
    pub fn accepted(session_present: bool) -> Self {
        Self {
            return_code: ReturnCode::Accepted,
            session_present,
        }
    }

    pub fn rejected(return_code: ReturnCode) -> Self {
        Self {
            return_code,
            session_present: false,
        }
    }

    /// Serialize to bytes for packet payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LoftError> {
        bincode::serialize(self).map_err(LoftError::from)
    }

    /// Deserialize from packet payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoftError> {
        bincode::deserialize(bytes).map_err(LoftError::from)
    }
}
