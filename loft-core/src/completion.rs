//! A single-slot completion signal.
//!
//! [`Completion`] lets any number of observers wait for a one-time
//! event, with or without a deadline, without busy-polling and without
//! losing the result if it arrives before anyone waits.
//! Request/response flows hand a clone to the caller and complete it
//! when the matching reply comes in.
//!
//! The state machine is Pending → Completed, terminal. Completion is
//! idempotent: the first result wins and later calls are no-ops. A
//! waiter that times out consumes nothing; every other waiter can
//! still observe the real completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::LoftError;

/// Thread-safe handle to a one-time completion slot.
///
/// Cloning yields another handle to the same slot.
#[derive(Debug)]
pub struct Completion<T> {
    slot: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Completion<T> {
    /// Create an uncompleted slot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { slot: Arc::new(tx) }
    }

    /// Record `value` and wake all current and future waiters.
    ///
    /// Returns `false` if the slot was already completed; the original
    /// value is kept.
    pub fn complete(&self, value: T) -> bool {
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    /// Non-blocking snapshot; safe from any concurrent caller.
    pub fn is_complete(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

impl<T: Clone> Completion<T> {
    /// The recorded value, if completed.
    pub fn try_get(&self) -> Option<T> {
        self.slot.borrow().clone()
    }

    /// Block until the slot completes and return the recorded value.
    /// Returns immediately if it already has.
    pub async fn wait(&self) -> T {
        let mut rx = self.slot.subscribe();
        let value = rx
            .wait_for(|slot| slot.is_some())
            .await
            .expect("sender is held by self");
        (*value).clone().expect("predicate guarantees Some")
    }

    /// Like [`wait`], but give up after `timeout`.
    ///
    /// A timeout resolves only this wait; the slot stays uncompleted
    /// and other waiters are undisturbed.
    ///
    /// [`wait`]: Completion::wait
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<T, LoftError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| LoftError::Timeout(timeout))
    }
}

// ── Tests ────────────────────────────────────────────────────────
