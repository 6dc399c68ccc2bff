//! End-to-end tests — full handshake, keep-alive and teardown flows
//! against a live broker on a localhost TCP listener.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time;
use tokio_util::sync::CancellationToken;

use loft_broker::backend::MemoryBackend;
use loft_broker::broker::Broker;
use loft_broker::config::BrokerConfig;
use loft_core::completion::Completion;
use loft_core::message::PacketType;
use loft_core::network::Connection;
use loft_core::packet::Packet;
use loft_core::protocol::{ConnectAck, ConnectRequest, ReturnCode};

// ── Helpers ──────────────────────────────────────────────────────

fn ephemeral_config() -> BrokerConfig {
    let mut config = BrokerConfig::default();
    config.network.bind_addr = "127.0.0.1:0".into();
    config
}

/// Start a broker on an OS-assigned port and return its address plus
/// the shutdown token.
async fn start_broker(
    config: BrokerConfig,
    backend: MemoryBackend,
) -> (SocketAddr, CancellationToken) {
    let broker = Broker::bind(config, backend).await.unwrap();
    let addr = broker.local_addr().unwrap();
    let shutdown = broker.shutdown_token();
    tokio::spawn(broker.run());
    (addr, shutdown)
}

async fn dial(addr: SocketAddr) -> Arc<Connection<TcpStream>> {
    Arc::new(Connection::new(TcpStream::connect(addr).await.unwrap()))
}

/// Connect and wait for the ConnAck.
async fn connect(conn: &Arc<Connection<TcpStream>>, request: &ConnectRequest) -> ConnectAck {
    conn.send(Packet::connect(request).unwrap(), false)
        .await
        .unwrap();
    conn.receive().await.unwrap().connect_ack().unwrap()
}

// ── Handshake ────────────────────────────────────────────────────

#[tokio::test]
async fn missed_connect_timeout_closes_with_no_bytes() {
    let mut config = ephemeral_config();
    config.session.connect_timeout_ms = 10;
    let (addr, shutdown) = start_broker(config, MemoryBackend::new()).await;

    // Open a carrier and never send a handshake.
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let start = Instant::now();
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).await.unwrap();

    // The broker closed the carrier without writing anything back.
    assert_eq!(n, 0);
    assert!(start.elapsed() < Duration::from_secs(1));

    shutdown.cancel();
}

#[tokio::test]
async fn accepted_handshake_acks() {
    let (addr, shutdown) = start_broker(ephemeral_config(), MemoryBackend::new()).await;

    let conn = dial(addr).await;
    let ack = connect(&conn, &ConnectRequest::new("bird-1")).await;
    assert_eq!(ack.return_code, ReturnCode::Accepted);
    assert!(!ack.session_present);

    conn.close().await.unwrap();
    shutdown.cancel();
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let backend = MemoryBackend::with_logins(HashMap::from([(
        "allow".to_string(),
        "allow".to_string(),
    )]));
    let (addr, shutdown) = start_broker(ephemeral_config(), backend).await;

    let conn = dial(addr).await;
    let request = ConnectRequest::new("intruder").with_credentials("allow", "deny");
    let ack = connect(&conn, &request).await;
    assert_eq!(ack.return_code, ReturnCode::BadCredentials);

    // The broker hangs up after the rejection.
    assert!(conn.receive().await.is_err());

    shutdown.cancel();
}

#[tokio::test]
async fn session_present_on_resumed_reconnect() {
    let (addr, shutdown) = start_broker(ephemeral_config(), MemoryBackend::new()).await;

    let request = ConnectRequest::new("veteran").with_resumed_session();

    let conn = dial(addr).await;
    let ack = connect(&conn, &request).await;
    assert!(!ack.session_present);
    conn.send(Packet::disconnect(), false).await.unwrap();
    conn.close().await.unwrap();

    let conn = dial(addr).await;
    let ack = connect(&conn, &request).await;
    assert!(ack.session_present);
    conn.close().await.unwrap();

    shutdown.cancel();
}

// ── Keep-alive ───────────────────────────────────────────────────

#[tokio::test]
async fn keep_alive_ping_pong_cadence() {
    let (addr, shutdown) = start_broker(ephemeral_config(), MemoryBackend::new()).await;

    let conn = dial(addr).await;
    let connack: Completion<ConnectAck> = Completion::new();
    let pongs = Arc::new(AtomicU32::new(0));

    // Reader task: resolve the ConnAck, count pongs.
    {
        let conn = Arc::clone(&conn);
        let connack = connack.clone();
        let pongs = Arc::clone(&pongs);
        tokio::spawn(async move {
            loop {
                let Ok(packet) = conn.receive().await else {
                    return;
                };
                match packet.packet_type() {
                    Ok(PacketType::ConnAck) => {
                        connack.complete(packet.connect_ack().unwrap());
                    }
                    Ok(PacketType::PingResp) => {
                        pongs.fetch_add(1, Ordering::SeqCst);
                    }
                    _ => return,
                }
            }
        });
    }

    let request = ConnectRequest::new("pinger").with_keep_alive(1);
    conn.send(Packet::connect(&request).unwrap(), false)
        .await
        .unwrap();

    let ack = connack.wait_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(ack.return_code, ReturnCode::Accepted);

    // Idle client: one ping per keep-alive interval.
    for _ in 0..2 {
        time::sleep(Duration::from_secs(1)).await;
        conn.send(Packet::ping(), true).await.unwrap();
    }
    time::sleep(Duration::from_millis(500)).await;

    assert_eq!(pongs.load(Ordering::SeqCst), 2);

    conn.send(Packet::disconnect(), false).await.unwrap();
    conn.close().await.unwrap();
    shutdown.cancel();
}

#[tokio::test]
async fn silent_client_is_disconnected_after_grace() {
    let (addr, shutdown) = start_broker(ephemeral_config(), MemoryBackend::new()).await;

    let conn = dial(addr).await;
    let ack = connect(&conn, &ConnectRequest::new("sleeper").with_keep_alive(1)).await;
    assert_eq!(ack.return_code, ReturnCode::Accepted);

    // Send nothing: the broker must drop us at 1.5× keep-alive.
    let start = Instant::now();
    let err = conn.receive().await.unwrap_err();
    assert!(matches!(err, loft_core::LoftError::Connection(_)));

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1400), "dropped too early: {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(2500), "dropped too late: {elapsed:?}");

    shutdown.cancel();
}
