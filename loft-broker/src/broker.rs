//! The broker service — network listener and session host.
//!
//! `Broker` accepts carriers on a TCP listener and hands each one to a
//! [`Session`] running in its own task. The session layer owns all
//! timing contracts (connect timeout, keep-alive liveness); this crate
//! only wires carriers to sessions. Message routing lives above this
//! crate, so application packets that reach the broker are dropped
//! with a log line.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use loft_core::error::LoftError;
use loft_core::network::Connection;
use loft_core::session::{Backend, Session, SessionConfig};

use crate::config::BrokerConfig;

/// Accepts connections and hosts one session task per client.
pub struct Broker<B: Backend> {
    listener: TcpListener,
    backend: Arc<B>,
    config: BrokerConfig,
    shutdown: CancellationToken,
}

impl<B: Backend> Broker<B> {
    /// Bind the listener and prepare a broker instance.
    pub async fn bind(config: BrokerConfig, backend: B) -> Result<Self, LoftError> {
        let listener = TcpListener::bind(&config.network.bind_addr).await?;
        Ok(Self {
            listener,
            backend: Arc::new(backend),
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, LoftError> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that stops [`run`] when cancelled.
    ///
    /// [`run`]: Broker::run
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accept connections until the shutdown token fires.
    pub async fn run(self) -> Result<(), LoftError> {
        info!(addr = %self.local_addr()?, "broker listening");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("broker shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!(%peer, "connection accepted");

                    let backend = Arc::clone(&self.backend);
                    let session_config = self.config.session_config();
                    tokio::spawn(serve(stream, peer, backend, session_config));
                }
            }
        }
    }
}

/// Drive one client from accept to teardown.
async fn serve<B: Backend>(
    stream: TcpStream,
    peer: SocketAddr,
    backend: Arc<B>,
    config: SessionConfig,
) {
    let conn = Arc::new(Connection::new(stream));
    let mut session = Session::accept(conn, backend, config);

    if let Err(err) = session.handshake().await {
        debug!(%peer, "handshake failed: {err}");
        return;
    }

    loop {
        match session.next_packet().await {
            Ok(Some(packet)) => {
                if let Ok(packet_type) = packet.packet_type() {
                    debug!(
                        client_id = session.client_id(),
                        %packet_type,
                        "dropping unrouted packet"
                    );
                }
            }
            Ok(None) => {
                debug!(client_id = session.client_id(), "client disconnected");
                return;
            }
            Err(err) => {
                debug!(client_id = session.client_id(), "session ended: {err}");
                return;
            }
        }
    }
}
