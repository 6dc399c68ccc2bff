//! Broker-side session layer.
//!
//! A [`Session`] drives the two time-bound protocol contracts that are
//! independent of message content: handshake punctuality (the connect
//! packet must arrive within the configured timeout, otherwise the
//! carrier closes with no reply) and liveness (once connected, silence
//! longer than 1.5× the negotiated keep-alive interval kills the
//! connection). Keep-alive pings are answered here; everything else is
//! handed to the caller.

pub mod state;

pub use state::SessionPhase;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::LoftError;
use crate::message::PacketType;
use crate::network::{Carrier, Connection};
use crate::packet::Packet;
use crate::protocol::{ConnectAck, ConnectRequest, ReturnCode};

// ── Backend ──────────────────────────────────────────────────────

/// The two decisions the session layer delegates to the storage /
/// policy backend. Everything else about the backend is opaque here.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Decide whether the connecting client may establish a session.
    async fn authenticate(&self, request: &ConnectRequest) -> bool;

    /// Whether prior session state exists for `client_id`.
    async fn session_present(&self, client_id: &str) -> bool;
}

// ── Config ───────────────────────────────────────────────────────

/// Session-level timing knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long an accepted carrier may sit without a handshake before
    /// it is closed with no reply. `Duration::ZERO` disables the check
    /// (useful for trusted internal links).
    pub connect_timeout: Duration,

    /// Maximum inbound packet size; 0 disables the cap.
    pub read_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_limit: 0,
        }
    }
}

// ── Session ──────────────────────────────────────────────────────

/// One client session layered on a [`Connection`].
pub struct Session<C: Carrier, B: Backend> {
    conn: Arc<Connection<C>>,
    backend: Arc<B>,
    config: SessionConfig,
    phase: SessionPhase,
    client_id: Option<String>,
}

impl<C: Carrier, B: Backend> Session<C, B> {
    /// Adopt a freshly accepted carrier. The session starts in
    /// `AwaitingConnect`; call [`handshake`] next.
    ///
    /// [`handshake`]: Session::handshake
    pub fn accept(conn: Arc<Connection<C>>, backend: Arc<B>, config: SessionConfig) -> Self {
        Self {
            conn,
            backend,
            config,
            phase: SessionPhase::default(),
            client_id: None,
        }
    }

    /// Run the connect handshake.
    ///
    /// Waits (bounded by the connect timeout) for the first packet,
    /// which must be a Connect. On success the negotiated keep-alive
    /// is recorded, the read deadline moves to the liveness window and
    /// a ConnAck carrying the resolved session-present flag is sent.
    ///
    /// On timeout or violation the connection is closed without a
    /// reply; rejected credentials get a ConnAck first.
    pub async fn handshake(&mut self) -> Result<ConnectAck, LoftError> {
        if self.phase != SessionPhase::AwaitingConnect {
            return Err(LoftError::ProtocolViolation(
                "handshake already performed",
            ));
        }

        if self.config.read_limit > 0 {
            self.conn.set_read_limit(self.config.read_limit);
        }
        if !self.config.connect_timeout.is_zero() {
            self.conn.set_read_timeout(self.config.connect_timeout);
        }

        // A receive failure (timeout included) has already closed the
        // carrier; no reply is ever sent for an incomplete handshake.
        let packet = match self.conn.receive().await {
            Ok(packet) => packet,
            Err(err) => {
                self.phase.close();
                debug!("handshake aborted: {err}");
                return Err(err);
            }
        };

        let request = match packet.connect_request() {
            Ok(request) => request,
            Err(err) => {
                self.phase.close();
                let _ = self.conn.close().await;
                return Err(err);
            }
        };

        if !self.backend.authenticate(&request).await {
            let ack = ConnectAck::rejected(ReturnCode::BadCredentials);
            let _ = self.conn.send(Packet::connack(&ack)?, false).await;
            self.phase.close();
            let _ = self.conn.close().await;
            debug!(client_id = %request.client_id, "credentials rejected");
            return Err(LoftError::ProtocolViolation("credentials rejected"));
        }

        let session_present = if request.clean_session {
            false
        } else {
            self.backend.session_present(&request.client_id).await
        };

        self.phase.complete_handshake(request.keep_alive())?;
        self.client_id = Some(request.client_id.clone());

        // From here on, liveness rides the sliding read deadline.
        let window = self.phase.liveness_window().unwrap_or(Duration::ZERO);
        self.conn.set_read_timeout(window);

        let ack = ConnectAck::accepted(session_present);
        if let Err(err) = self.conn.send(Packet::connack(&ack)?, false).await {
            self.phase.close();
            return Err(err);
        }

        debug!(
            client_id = %request.client_id,
            keep_alive = ?request.keep_alive(),
            session_present,
            "session connected"
        );
        Ok(ack)
    }

    /// Receive the next application packet.
    ///
    /// Keep-alive pings are answered inline (one PingResp per PingReq,
    /// always) and never surface. Returns `Ok(None)` on a clean
    /// Disconnect. A liveness expiry or carrier failure closes the
    /// session and surfaces the error.
    pub async fn next_packet(&mut self) -> Result<Option<Packet>, LoftError> {
        if !self.phase.is_connected() {
            return Err(LoftError::ConnectionClosed);
        }

        loop {
            let packet = match self.conn.receive().await {
                Ok(packet) => packet,
                Err(err) => {
                    self.phase.close();
                    debug!(client_id = self.client_id.as_deref(), "session lost: {err}");
                    return Err(err);
                }
            };

            match packet.packet_type()? {
                PacketType::PingReq => {
                    trace!(client_id = self.client_id.as_deref(), "ping");
                    if let Err(err) = self.conn.send(Packet::pong(), false).await {
                        self.phase.close();
                        return Err(err);
                    }
                }
                PacketType::Disconnect => {
                    self.close().await?;
                    return Ok(None);
                }
                PacketType::Connect => {
                    self.close().await?;
                    return Err(LoftError::ProtocolViolation(
                        "duplicate connect on live session",
                    ));
                }
                _ => return Ok(Some(packet)),
            }
        }
    }

    /// Tear the session down, releasing the carrier exactly once.
    pub async fn close(&mut self) -> Result<(), LoftError> {
        if self.phase.close() {
            debug!(client_id = self.client_id.as_deref(), "session closed");
            self.conn.close().await?;
        }
        Ok(())
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// The client identifier, once the handshake has recorded it.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn connection(&self) -> &Arc<Connection<C>> {
        &self.conn
    }
}

// ── Tests ────────────────────────────────────────────────────────
