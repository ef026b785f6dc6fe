//! Outbound messages pushed to a session's channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// What an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// The request was accepted and is being worked on.
    Processing,
    /// The final answer.
    Response,
    /// The request failed; `body` is the caller-safe message.
    Error,
}

/// A message addressed to one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique message identifier.
    pub id: u64,
    pub session_id: String,
    pub kind: EnvelopeKind,
    pub body: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Envelope {
    pub fn new(session_id: &str, kind: EnvelopeKind, body: impl Into<String>) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            session_id: session_id.to_string(),
            kind,
            body: body.into(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        }
    }

    pub fn processing(session_id: &str) -> Self {
        Self::new(session_id, EnvelopeKind::Processing, "Processing your request...")
    }

    pub fn response(session_id: &str, body: impl Into<String>) -> Self {
        Self::new(session_id, EnvelopeKind::Response, body)
    }

    pub fn error(session_id: &str, body: impl Into<String>) -> Self {
        Self::new(session_id, EnvelopeKind::Error, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_creation() {
        let envelope = Envelope::response("ws-1", "Hello");
        assert_eq!(envelope.session_id, "ws-1");
        assert_eq!(envelope.body, "Hello");
        assert_eq!(envelope.kind, EnvelopeKind::Response);
        assert!(envelope.id > 0);
        assert!(envelope.timestamp > 0);
    }

    #[test]
    fn test_ids_increase() {
        let first = Envelope::processing("s");
        let second = Envelope::processing("s");
        assert!(second.id > first.id);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(Envelope::error("s", "oops")).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["session_id"], "s");
        assert_eq!(json["body"], "oops");
    }
}
