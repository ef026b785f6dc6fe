//! Per-session conversation history, kept in memory.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::debug;

use crate::llm::ChatMessage;

#[derive(Default)]
struct Transcript {
    messages: VecDeque<ChatMessage>,
    /// Value of the store's clock at the last update.
    touched: u64,
}

#[derive(Default)]
struct Sessions {
    clock: u64,
    map: HashMap<String, Transcript>,
}

/// Bounded message history per session. Oldest messages drop first; when
/// more than `max_sessions` sessions have history, the least recently
/// updated one is forgotten.
pub struct TranscriptStore {
    max_messages: usize,
    max_sessions: usize,
    sessions: Mutex<Sessions>,
}

impl TranscriptStore {
    pub fn new(max_messages: usize, max_sessions: usize) -> Self {
        Self {
            max_messages,
            max_sessions: max_sessions.max(1),
            sessions: Mutex::new(Sessions::default()),
        }
    }

    /// Snapshot of a session's history, oldest first.
    pub fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        let sessions = self.lock();
        sessions
            .map
            .get(session_id)
            .map(|t| t.messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Record one completed exchange.
    pub fn record(&self, session_id: &str, query: &str, answer: &str) {
        if self.max_messages == 0 {
            return;
        }
        let mut sessions = self.lock();
        sessions.clock += 1;
        let now = sessions.clock;

        if !sessions.map.contains_key(session_id) && sessions.map.len() >= self.max_sessions {
            let stalest = sessions
                .map
                .iter()
                .min_by_key(|(_, t)| t.touched)
                .map(|(id, _)| id.clone());
            if let Some(id) = stalest {
                sessions.map.remove(&id);
                debug!(session_id = %id, "Evicted least recently used transcript");
            }
        }

        let transcript = sessions.map.entry(session_id.to_string()).or_default();
        transcript.touched = now;
        transcript.messages.push_back(ChatMessage::user(query));
        transcript.messages.push_back(ChatMessage::assistant(answer));
        while transcript.messages.len() > self.max_messages {
            transcript.messages.pop_front();
        }
    }

    /// Forget a session.
    pub fn clear(&self, session_id: &str) {
        self.lock().map.remove(session_id);
    }

    pub fn session_count(&self) -> usize {
        self.lock().map.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
