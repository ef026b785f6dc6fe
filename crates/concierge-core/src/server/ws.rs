//! WebSocket sessions.
//!
//! One connection is one session. Every inbound text frame is a query
//! (raw text or `{"query": "..."}`); the session first gets a `processing`
//! envelope, then a `response` or `error` envelope. Queries on the same
//! connection are handled one at a time, in arrival order. The session's
//! transcript is dropped when the connection closes, unless a newer
//! connection has taken over the id.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::AppState;
use super::types::WsParams;
use crate::message::Envelope;
use crate::session::SessionGuard;

/// Reply to a frame with no usable query.
pub const EMPTY_QUERY_MESSAGE: &str = "Please send a non-empty message.";

pub(crate) async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let session_id = params
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.new_session_id("ws"));
    ws.on_upgrade(move |socket| handle_socket(state, session_id, socket))
}

async fn handle_socket(state: Arc<AppState>, session_id: String, socket: WebSocket) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

    let guard = state.sessions.attach(&session_id, tx);
    info!(session_id = %session_id, "WebSocket session opened");

    // Outbound: session channel -> socket.
    let write_task = async move {
        while let Some(envelope) = rx.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode envelope");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    };

    // Inbound: socket -> orchestrator.
    let read_task = async {
        while let Some(Ok(msg)) = ws_stream.next().await {
            match msg {
                Message::Text(text) => handle_text(&state, &guard, text.as_str()).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = write_task => {},
        _ = read_task => {},
    }

    if guard.is_current() {
        state.orchestrator.transcripts().clear(&session_id);
    }
    drop(guard);
    info!(session_id = %session_id, "WebSocket session closed");
}

/// Answer one inbound frame on the connection behind `session`.
pub(crate) async fn handle_text(state: &AppState, session: &SessionGuard, text: &str) {
    let session_id = session.session_id();
    let Some(query) = extract_query(text) else {
        session.send(Envelope::error(session_id, EMPTY_QUERY_MESSAGE));
        return;
    };

    session.send(Envelope::processing(session_id));
    let outcome = state.orchestrator.run(session_id, &query).await;
    let envelope = if outcome.is_success() {
        Envelope::response(session_id, outcome.text)
    } else {
        Envelope::error(session_id, outcome.text)
    };
    if !session.send(envelope) {
        debug!(session_id, "Connection gone before the answer was ready");
    }
}

/// Raw text, or the `query` field of a JSON object.
pub(crate) fn extract_query(text: &str) -> Option<String> {
    let text = text.trim();
    let query = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => map
            .get("query")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        _ => text.to_string(),
    };
    (!query.is_empty()).then_some(query)
}
