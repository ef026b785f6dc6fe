//! In-crate fakes for unit tests.
//!
//! Integration tests use the equivalents in `concierge-test-utils`; those
//! cannot be used here because they implement this crate's traits from the
//! outside.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::BoxFuture;
use crate::llm::{ChatRequest, ChatResponse, LlmError, LlmProvider, TokenUsage};
use crate::tools::{DiscoveryError, Tool, ToolSource};

pub(crate) enum Reply {
    Text(String),
    Fail,
    Stall,
}

/// Replays canned replies in order and records every request.
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Reply::Text(r.to_string())).collect())
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn chat(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChatResponse, LlmError>> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        Box::pin(async move {
            match reply {
                Some(Reply::Text(content)) => Ok(ChatResponse {
                    content,
                    finish_reason: "stop".to_string(),
                    usage: TokenUsage::default(),
                    model: "scripted".to_string(),
                }),
                Some(Reply::Fail) => Err(LlmError::ProviderError {
                    status: 500,
                    message: "internal model failure".to_string(),
                }),
                Some(Reply::Stall) => std::future::pending().await,
                None => Err(LlmError::ProviderError {
                    status: 500,
                    message: "script exhausted".to_string(),
                }),
            }
        })
    }
}

/// Tool source that counts discovery calls.
pub(crate) struct CountingSource {
    tools: Vec<Tool>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl CountingSource {
    pub(crate) fn with_tools(tools: Vec<Tool>) -> Self {
        Self {
            tools,
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::with_tools(Vec::new())
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ToolSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    fn discover(&self) -> BoxFuture<'_, Result<Vec<Tool>, DiscoveryError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.failure {
                Some(message) => Err(DiscoveryError::Failed(message.clone())),
                None => Ok(self.tools.clone()),
            }
        })
    }
}
