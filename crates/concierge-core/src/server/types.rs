//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

/// `POST /ask` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// Omit to start a new session.
    #[serde(default)]
    pub session_id: Option<String>,
    pub query: String,
}

/// `POST /ask` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub session_id: String,
    /// The answer, or the caller-safe failure message.
    pub response: String,
    /// "ok" or "error".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
    pub build_profile: String,
    pub uptime_secs: u64,
    pub open_sessions: usize,
    /// Sessions with conversation history in memory.
    pub transcript_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// `GET /tools` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub discovery_enabled: bool,
    pub tools: Vec<ToolInfo>,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /ws` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub session_id: Option<String>,
}
