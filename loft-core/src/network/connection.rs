//! The connection transport engine.
//!
//! A [`Connection`] owns one carrier and moves whole packets across it
//! with explicit control over when bytes actually leave the process.
//! Sends are serialized by one mutex region, receives by another, so a
//! writer task and a reader task never contend with each other.
//!
//! Synchronous sends flush inline. Asynchronous sends only buffer the
//! packet and arm a single deferred flush that fires after
//! [`FLUSH_DELAY`], coalescing bursts of reply traffic into one carrier
//! write. A failed deferred flush closes the carrier and is latched;
//! the *next* send call reports it exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{self, AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::codec::PacketCodec;
use crate::error::LoftError;
use crate::packet::Packet;

/// Delay before asynchronously buffered packets are flushed to the
/// carrier.
pub const FLUSH_DELAY: Duration = Duration::from_millis(1);

/// A byte-stream duplex a [`Connection`] can run over: TCP streams,
/// in-memory pipes and test doubles all qualify.
pub trait Carrier: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Carrier for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

// ── Send region ──────────────────────────────────────────────────

/// State mutated only while the send mutex is held.
struct SendState<C: Carrier> {
    writer: FramedWrite<WriteHalf<C>, PacketCodec>,
    /// In-flight deferred flush; at most one per connection.
    flush_task: Option<JoinHandle<()>>,
    /// Error from a failed deferred flush, reported to the next send.
    flush_error: Option<LoftError>,
}

/// The send region plus the pieces the deferred flush task shares.
struct SendHalf<C: Carrier> {
    state: Mutex<SendState<C>>,
    shutdown: CancellationToken,
    closed: AtomicBool,
}

impl<C: Carrier> SendHalf<C> {
    /// Close the carrier. The caller must hold the send region.
    async fn shutdown_carrier(&self, state: &mut SendState<C>) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        if let Some(task) = state.flush_task.take() {
            task.abort();
        }
        let _ = state.writer.get_mut().shutdown().await;
    }

    /// Deferred flush armed by an asynchronous send. Contends for the
    /// send region like any foreground sender.
    async fn deferred_flush(self: Arc<Self>) {
        time::sleep(FLUSH_DELAY).await;

        let mut state = self.state.lock().await;
        state.flush_task = None;

        if let Err(err) = state.writer.flush().await {
            tracing::debug!("deferred flush failed: {err}");
            self.shutdown_carrier(&mut state).await;
            // First error wins; a second failure before the first is
            // observed is dropped, not queued.
            if state.flush_error.is_none() {
                state.flush_error = Some(err);
            }
        }
    }
}

// ── Connection ───────────────────────────────────────────────────

/// Framed packet transport over a single exclusively-owned carrier.
///
/// One caller may be inside [`send`] and one inside [`receive`] at the
/// same time; each path is serialized independently.
///
/// [`send`]: Connection::send
/// [`receive`]: Connection::receive
pub struct Connection<C: Carrier> {
    send: Arc<SendHalf<C>>,
    recv: Mutex<FramedRead<ReadHalf<C>, PacketCodec>>,
    /// Sliding read deadline in nanoseconds; 0 disables it.
    read_timeout: AtomicU64,
    read_limit: Arc<AtomicUsize>,
}

impl<C: Carrier> Connection<C> {
    /// Wrap a carrier, taking exclusive ownership of it.
    pub fn new(carrier: C) -> Self {
        let read_limit = Arc::new(AtomicUsize::new(0));
        let (read_half, write_half) = io::split(carrier);

        Self {
            send: Arc::new(SendHalf {
                state: Mutex::new(SendState {
                    writer: FramedWrite::new(write_half, PacketCodec::new()),
                    flush_task: None,
                    flush_error: None,
                }),
                shutdown: CancellationToken::new(),
                closed: AtomicBool::new(false),
            }),
            recv: Mutex::new(FramedRead::new(
                read_half,
                PacketCodec::with_limit(read_limit.clone()),
            )),
            read_timeout: AtomicU64::new(0),
            read_limit,
        }
    }

    /// Buffer `packet` for transmission.
    ///
    /// If a deferred flush previously failed, its latched error is
    /// cleared and returned before the new packet is even buffered.
    /// With `async_flush == false` the buffer is flushed inline and any
    /// pending deferred flush is canceled. With `async_flush == true`
    /// the packet only joins the buffer; a deferred flush is armed if
    /// none is pending.
    ///
    /// Only one caller can be inside `send` at a time.
    pub async fn send(&self, packet: Packet, async_flush: bool) -> Result<(), LoftError> {
        let mut state = self.send.state.lock().await;

        // Clear and return any error from a deferred flush.
        if let Some(err) = state.flush_error.take() {
            return Err(err);
        }

        if self.send.closed.load(Ordering::SeqCst) {
            return Err(LoftError::ConnectionClosed);
        }

        // Encode into the write buffer without flushing.
        if let Err(err) = state.writer.feed(packet).await {
            self.send.shutdown_carrier(&mut state).await;
            return Err(err);
        }

        if !async_flush {
            // Cancel the deferred flush; this flush covers it.
            if let Some(task) = state.flush_task.take() {
                task.abort();
            }
            if let Err(err) = state.writer.flush().await {
                self.send.shutdown_carrier(&mut state).await;
                return Err(err);
            }
            return Ok(());
        }

        if state.flush_task.is_none() {
            let half = Arc::clone(&self.send);
            state.flush_task = Some(tokio::spawn(half.deferred_flush()));
        }

        Ok(())
    }

    /// Block until one full packet is decoded from the carrier.
    ///
    /// The read deadline set via [`set_read_timeout`] is re-armed on
    /// every call; a silent peer fails the receive with
    /// [`LoftError::Timeout`]. Any failure closes the carrier.
    ///
    /// Only one caller can be inside `receive` at a time.
    ///
    /// [`set_read_timeout`]: Connection::set_read_timeout
    pub async fn receive(&self) -> Result<Packet, LoftError> {
        let mut reader = self.recv.lock().await;

        if self.send.closed.load(Ordering::SeqCst) {
            return Err(LoftError::ConnectionClosed);
        }

        let timeout = Duration::from_nanos(self.read_timeout.load(Ordering::Relaxed));
        let result = if timeout.is_zero() {
            Self::next_packet(&mut reader, &self.send.shutdown).await
        } else {
            match time::timeout(timeout, Self::next_packet(&mut reader, &self.send.shutdown))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(LoftError::Timeout(timeout)),
            }
        };

        match result {
            Ok(packet) => Ok(packet),
            Err(err) => {
                self.fatal_close().await;
                Err(err)
            }
        }
    }

    async fn next_packet(
        reader: &mut FramedRead<ReadHalf<C>, PacketCodec>,
        shutdown: &CancellationToken,
    ) -> Result<Packet, LoftError> {
        tokio::select! {
            _ = shutdown.cancelled() => Err(LoftError::ConnectionClosed),
            frame = reader.next() => match frame {
                Some(Ok(packet)) => Ok(packet),
                Some(Err(err)) => Err(err),
                None => Err(LoftError::Connection(
                    std::io::ErrorKind::UnexpectedEof.into(),
                )),
            },
        }
    }

    /// Close the carrier after a fatal receive-side error.
    async fn fatal_close(&self) {
        if self.send.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.send.shutdown.cancel();

        let mut state = self.send.state.lock().await;
        if let Some(task) = state.flush_task.take() {
            task.abort();
        }
        let _ = state.writer.get_mut().shutdown().await;
    }

    /// Flush buffered bytes best-effort, then close the carrier.
    ///
    /// Idempotent; a second close is a no-op. Unblocks a concurrently
    /// blocked [`receive`], which fails with
    /// [`LoftError::ConnectionClosed`].
    ///
    /// [`receive`]: Connection::receive
    pub async fn close(&self) -> Result<(), LoftError> {
        let mut state = self.send.state.lock().await;

        if self.send.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(task) = state.flush_task.take() {
            task.abort();
        }

        let flush_result = state.writer.flush().await;
        let shutdown_result = state.writer.get_mut().shutdown().await;
        self.send.shutdown.cancel();

        flush_result?;
        shutdown_result?;
        Ok(())
    }

    /// Cap the size of inbound packets. A packet exceeding `limit`
    /// bytes fails the receive and closes the connection; 0 removes
    /// the cap.
    pub fn set_read_limit(&self, limit: usize) {
        self.read_limit.store(limit, Ordering::Relaxed);
    }

    /// Set the maximum silence between received packets. Each
    /// successful [`receive`] slides the window forward;
    /// `Duration::ZERO` disables the deadline.
    ///
    /// [`receive`]: Connection::receive
    pub fn set_read_timeout(&self, timeout: Duration) {
        self.read_timeout
            .store(timeout.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Non-blocking snapshot of the closed flag.
    pub fn is_closed(&self) -> bool {
        self.send.closed.load(Ordering::SeqCst)
    }
}

// ── Tests ────────────────────────────────────────────────────────
