//! The [`LlmProvider`] trait and the deadline-bounded completion helper.
//!
//! The router and the responder talk to the model only through this
//! interface, so tests can substitute a scripted provider.

use std::time::Duration;

use crate::BoxFuture;

use super::types::{ChatRequest, ChatResponse};

/// Errors from LLM provider calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("authentication failed (check API key): {0}")]
    Auth(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("timeout")]
    Timeout,
}

/// Core trait for LLM providers.
///
/// Implementations must be `Send + Sync` for use across request tasks.
/// Uses `BoxFuture` for object safety (allows `Arc<dyn LlmProvider>`).
pub trait LlmProvider: Send + Sync {
    /// Provider display name (e.g. "OpenAI").
    fn name(&self) -> &str;

    /// Perform a chat completion.
    fn chat(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChatResponse, LlmError>>;
}

/// Run one completion under a deadline and return the trimmed text.
///
/// Expiry maps to [`LlmError::Timeout`]; blank output to
/// [`LlmError::EmptyResponse`].
pub async fn complete(
    provider: &dyn LlmProvider,
    request: &ChatRequest,
    deadline: Duration,
) -> Result<String, LlmError> {
    let response = tokio::time::timeout(deadline, provider.chat(request))
        .await
        .map_err(|_| LlmError::Timeout)??;

    let text = response.content.trim();
    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.to_string())
}
