//! HTTP and WebSocket transport.
//!
//! | route | purpose |
//! |---|---|
//! | `POST /ask` | one query, one JSON answer |
//! | `GET /ws` | duplex session: `processing` then `response`/`error` per frame |
//! | `GET /tools` | discovered tools (triggers discovery if needed) |
//! | `GET /health` | liveness and build info |

pub mod types;
mod ws;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use crate::daemon::ShutdownSignal;
use crate::orchestrator::Orchestrator;
use crate::session::SessionRegistry;

pub use types::*;
pub use ws::EMPTY_QUERY_MESSAGE;

/// Errors from the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state accessible to all route handlers.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: SessionRegistry,
    pub started_at: Instant,
    next_session: AtomicU64,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: SessionRegistry::new(),
            started_at: Instant::now(),
            next_session: AtomicU64::new(1),
        }
    }

    /// Fresh session id for a client that did not bring one.
    pub fn new_session_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_session.fetch_add(1, Ordering::Relaxed))
    }
}

/// Build the axum router with all routes and the CORS layer.
pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Result<axum::Router, ServerError> {
    Ok(axum::Router::new()
        .route("/ask", post(handle_ask))
        .route("/ws", get(ws::ws_handler))
        .route("/tools", get(handle_tools))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(cors_layer(cors_origins)?))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, ServerError> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|_| ServerError::InvalidCorsOrigin(o.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Serve `app` on `listener` until a shutdown signal arrives.
pub async fn serve(
    listener: TcpListener,
    app: axum::Router,
    mut shutdown_rx: broadcast::Receiver<ShutdownSignal>,
) -> Result<(), ServerError> {
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("HTTP server shutting down");
        })
        .await?;
    Ok(())
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn handle_ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.query.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: EMPTY_QUERY_MESSAGE.to_string(),
            }),
        ));
    }

    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.new_session_id("http"));

    let outcome = state.orchestrator.run(&session_id, req.query.trim()).await;
    Ok(Json(AskResponse {
        session_id: outcome.session_id.clone(),
        status: if outcome.is_success() { "ok" } else { "error" }.to_string(),
        error_kind: outcome.error_kind.map(|k| k.as_str().to_string()),
        response: outcome.text,
    }))
}

async fn handle_tools(State(state): State<Arc<AppState>>) -> Json<ToolsResponse> {
    let registry = state.orchestrator.registry();
    let tools = registry
        .ensure_loaded()
        .await
        .iter()
        .map(|t| ToolInfo {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.input_schema.clone(),
        })
        .collect();
    Json(ToolsResponse {
        discovery_enabled: registry.is_enabled(),
        tools,
    })
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::build_info::VERSION.to_string(),
        git_hash: crate::build_info::GIT_HASH.to_string(),
        build_profile: crate::build_info::BUILD_PROFILE.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        open_sessions: state.sessions.len(),
        transcript_sessions: state.orchestrator.transcripts().session_count(),
    })
}
