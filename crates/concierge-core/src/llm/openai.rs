//! Chat Completions client.
//!
//! Works against OpenAI and anything that speaks the same wire format
//! (Ollama, vLLM, LiteLLM) when given that server's API root.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BoxFuture;
use crate::secret::SecretValue;

use super::provider::{LlmError, LlmProvider};
use super::types::{ChatRequest, ChatResponse, Role, TokenUsage};

const DEFAULT_API_ROOT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

pub struct OpenAiProvider {
    http: Client,
    api_key: SecretValue,
    endpoint: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: SecretValue::new(api_key),
            endpoint: completions_url(DEFAULT_API_ROOT),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Model used when a request leaves `model` empty.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at another API root, e.g. `http://localhost:11434/v1`.
    pub fn with_base_url(mut self, root: impl AsRef<str>) -> Self {
        self.endpoint = completions_url(root.as_ref());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn wire_request<'a>(&'a self, request: &'a ChatRequest) -> WireRequest<'a> {
        let model = if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        };

        let system = request.system.as_deref().map(|content| WireMessage {
            role: Role::System,
            content,
        });
        let messages = system
            .into_iter()
            .chain(request.messages.iter().map(|m| WireMessage {
                role: m.role,
                content: &m.content,
            }))
            .collect();

        WireRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

fn completions_url(root: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.ends_with("/chat/completions") {
        root.to_string()
    } else {
        format!("{root}/chat/completions")
    }
}

/// Map a non-success HTTP status to the provider error the caller sees.
fn status_error(status: StatusCode, headers: &HeaderMap, body: String) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::Auth(format!("provider rejected the API key ({})", status.as_u16()))
        }
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            retry_after_secs: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => LlmError::ProviderError {
            status: status.as_u16(),
            message: body,
        },
    }
}

impl WireResponse {
    fn into_chat_response(self) -> Result<ChatResponse, LlmError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("completion has no choices".to_string()))?;
        let usage = self
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
            usage,
            model: self.model,
        })
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn chat(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChatResponse, LlmError>> {
        let body = serde_json::to_value(self.wire_request(request));
        Box::pin(async move {
            let body = body.map_err(|e| LlmError::Parse(format!("encoding request: {e}")))?;
            debug!(endpoint = %self.endpoint, model = %body["model"], "Chat completion request");

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(self.api_key.expose())
                .json(&body)
                .send()
                .await
                .map_err(|e| LlmError::Network(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let headers = resp.headers().clone();
                let text = resp.text().await.unwrap_or_default();
                return Err(status_error(status, &headers, text));
            }

            let wire: WireResponse = resp
                .json()
                .await
                .map_err(|e| LlmError::Parse(e.to_string()))?;
            wire.into_chat_response()
        })
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireReply,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
