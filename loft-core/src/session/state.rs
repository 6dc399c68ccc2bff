//! Session lifecycle state machine.
//!
//! Provides a `SessionPhase` enum that models the time-bound protocol
//! contracts of a broker-side session, with validated transitions that
//! return `Result` instead of panicking.

use std::time::{Duration, Instant};

use crate::error::LoftError;

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of a broker-side session.
///
/// ```text
///  AwaitingConnect ──► Connected
///        │                 │
///        ▼                 ▼
///        └────► Closed ◄───┘
/// ```
///
/// `Closed` is terminal and reachable from either state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Carrier accepted; the handshake packet has not arrived yet.
    /// A connect-timeout timer runs against this phase.
    #[default]
    AwaitingConnect,

    /// Handshake complete; keep-alive liveness is enforced.
    Connected {
        /// Keep-alive interval negotiated in the handshake;
        /// `Duration::ZERO` disables the liveness deadline.
        keep_alive: Duration,
        /// When the session entered the `Connected` state.
        since: Instant,
    },

    /// Session torn down. All further operations fail.
    Closed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingConnect => write!(f, "AwaitingConnect"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl SessionPhase {
    /// Returns `true` when the handshake has completed and the session
    /// is live.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns `true` when the session has been torn down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// The negotiated keep-alive interval.
    ///
    /// Returns `None` unless connected.
    pub fn keep_alive(&self) -> Option<Duration> {
        match self {
            Self::Connected { keep_alive, .. } => Some(*keep_alive),
            _ => None,
        }
    }

    /// How long the session has been in the `Connected` state.
    ///
    /// Returns `None` for any other phase.
    pub fn connected_duration(&self) -> Option<Duration> {
        match self {
            Self::Connected { since, .. } => Some(since.elapsed()),
            _ => None,
        }
    }

    /// The read deadline enforced while connected: 1.5× the keep-alive
    /// interval. `Duration::ZERO` (keep-alive disabled) maps to
    /// `Duration::ZERO` (no deadline).
    pub fn liveness_window(&self) -> Option<Duration> {
        self.keep_alive().map(|keep_alive| {
            if keep_alive.is_zero() {
                Duration::ZERO
            } else {
                keep_alive + keep_alive / 2
            }
        })
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connected`, recording the negotiated keep-alive.
    ///
    /// Valid from: `AwaitingConnect`.
    pub fn complete_handshake(&mut self, keep_alive: Duration) -> Result<(), LoftError> {
        match self {
            Self::AwaitingConnect => {
                *self = Self::Connected {
                    keep_alive,
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(LoftError::ProtocolViolation(
                "cannot complete handshake: not in AwaitingConnect state",
            )),
        }
    }

    /// Transition to `Closed`.
    ///
    /// Valid from any state. Returns `true` if this call performed the
    /// transition, `false` if the session was already closed.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        *self = Self::Closed;
        true
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = SessionPhase::default();
        assert!(!phase.is_connected());

        phase.complete_handshake(Duration::from_secs(30)).unwrap();
        assert!(phase.is_connected());
        assert_eq!(phase.keep_alive(), Some(Duration::from_secs(30)));
        assert!(phase.connected_duration().is_some());

        assert!(phase.close());
        assert!(phase.is_closed());
    }

    #[test]
    fn handshake_twice_is_a_violation() {
        let mut phase = SessionPhase::default();
        phase.complete_handshake(Duration::from_secs(1)).unwrap();
        assert!(phase.complete_handshake(Duration::from_secs(1)).is_err());
    }

    #[test]
    fn handshake_after_close_is_a_violation() {
        let mut phase = SessionPhase::default();
        phase.close();
        assert!(phase.complete_handshake(Duration::from_secs(1)).is_err());
    }

    #[test]
    fn close_from_awaiting_connect() {
        let mut phase = SessionPhase::default();
        assert!(phase.close());
        assert!(phase.is_closed());
    }

    #[test]
    fn close_is_idempotent() {
        let mut phase = SessionPhase::default();
        assert!(phase.close());
        assert!(!phase.close());
    }

    #[test]
    fn liveness_window_is_one_and_a_half_keep_alives() {
        let mut phase = SessionPhase::default();
        phase.complete_handshake(Duration::from_secs(2)).unwrap();
        assert_eq!(phase.liveness_window(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn zero_keep_alive_disables_the_window() {
        let mut phase = SessionPhase::default();
        phase.complete_handshake(Duration::ZERO).unwrap();
        assert_eq!(phase.liveness_window(), Some(Duration::ZERO));
    }

    #[test]
    fn display_format() {
        assert_eq!(SessionPhase::AwaitingConnect.to_string(), "AwaitingConnect");
        assert_eq!(SessionPhase::Closed.to_string(), "Closed");
        assert_eq!(
            SessionPhase::Connected {
                keep_alive: Duration::ZERO,
                since: Instant::now(),
            }
            .to_string(),
            "Connected"
        );
    }
}
