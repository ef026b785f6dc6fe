//! Live session channels.
//!
//! Each open WebSocket registers the sending half of its outbound queue
//! under its session id. Registration returns a [`SessionGuard`]; dropping
//! the guard unregisters, so the entry disappears on every exit path of the
//! connection task, panics included. Replies go out through the guard, so
//! they reach the connection that asked even after another connection
//! claimed the same id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::message::Envelope;

struct Entry {
    connection: u64,
    sender: mpsc::UnboundedSender<Envelope>,
}

#[derive(Default)]
struct Inner {
    sessions: Mutex<HashMap<String, Entry>>,
    next_connection: AtomicU64,
}

/// Registry of session id to outbound channel.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sender` as the channel for `session_id`.
    ///
    /// A later connection with the same id replaces the earlier one; the
    /// earlier guard then leaves the new entry alone when it drops.
    pub fn attach(&self, session_id: &str, sender: mpsc::UnboundedSender<Envelope>) -> SessionGuard {
        let connection = self.inner.next_connection.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .lock()
            .insert(
                session_id.to_string(),
                Entry {
                    connection,
                    sender: sender.clone(),
                },
            )
            .is_some();
        debug!(session_id, connection, replaced, "Session attached");

        SessionGuard {
            registry: self.clone(),
            session_id: session_id.to_string(),
            connection,
            sender,
        }
    }

    /// Push an envelope to whichever connection currently holds its session
    /// id. Returns `false` when the session is gone or its receiver closed.
    pub fn send(&self, envelope: Envelope) -> bool {
        let sessions = self.lock();
        match sessions.get(&envelope.session_id) {
            Some(entry) => entry.sender.send(envelope).is_ok(),
            None => false,
        }
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn owns(&self, session_id: &str, connection: u64) -> bool {
        self.lock()
            .get(session_id)
            .is_some_and(|entry| entry.connection == connection)
    }

    fn detach(&self, session_id: &str, connection: u64) {
        let mut sessions = self.lock();
        if sessions
            .get(session_id)
            .is_some_and(|entry| entry.connection == connection)
        {
            sessions.remove(session_id);
            debug!(session_id, connection, "Session detached");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

/// Keeps a session registered for as long as it lives.
pub struct SessionGuard {
    registry: SessionRegistry,
    session_id: String,
    connection: u64,
    sender: mpsc::UnboundedSender<Envelope>,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Push an envelope to this connection. Returns `false` once its
    /// receiver is closed.
    pub fn send(&self, envelope: Envelope) -> bool {
        self.sender.send(envelope).is_ok()
    }

    /// Whether this connection still holds its session id.
    pub fn is_current(&self) -> bool {
        self.registry.owns(&self.session_id, self.connection)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.detach(&self.session_id, self.connection);
    }
}
