//! In-memory backend.
//!
//! Holds everything in process memory: a login table for
//! authentication and the set of client IDs with known session state.
//! Suitable for tests and single-node deployments.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use loft_core::protocol::ConnectRequest;
use loft_core::session::Backend;

/// Backend keeping all state in memory.
///
/// With an empty login table every client is allowed (anonymous mode).
/// Session presence is recorded on first lookup, so a client that
/// reconnects with a resumed session observes `session_present = true`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    logins: HashMap<String, String>,
    sessions: Mutex<HashSet<String>>,
}

impl MemoryBackend {
    /// Anonymous backend: every connect is accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend requiring one of the given username/password pairs.
    pub fn with_logins(logins: HashMap<String, String>) -> Self {
        Self {
            logins,
            sessions: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn authenticate(&self, request: &ConnectRequest) -> bool {
        if self.logins.is_empty() {
            return true;
        }
        match (&request.username, &request.password) {
            (Some(username), Some(password)) => {
                self.logins.get(username) == Some(password)
            }
            _ => false,
        }
    }

    async fn session_present(&self, client_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        !sessions.insert(client_id.to_string())
    }
}
