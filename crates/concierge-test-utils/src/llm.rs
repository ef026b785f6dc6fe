//! A language model that plays back a script.

use std::collections::VecDeque;
use std::sync::Mutex;

use concierge_core::BoxFuture;
use concierge_core::llm::{ChatRequest, ChatResponse, LlmError, LlmProvider, TokenUsage};

enum Step {
    Say(String),
    Fail(LlmError),
    Hang,
}

/// Answers each `chat` call with the next scripted step and keeps a copy of
/// every request it saw.
///
/// Once the script runs out every call fails with a 500 provider error.
///
/// ```ignore
/// let llm = ScriptedProvider::new()
///     .say(r#"{"selected_tool_name": "getInterns"}"#)
///     .say("There are two interns.");
/// ```
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn say(self, text: impl Into<String>) -> Self {
        self.push(Step::Say(text.into()))
    }

    /// Queue a failure.
    pub fn fail(self, err: LlmError) -> Self {
        self.push(Step::Fail(err))
    }

    /// Queue a call that never completes.
    pub fn hang(self) -> Self {
        self.push(Step::Hang)
    }

    fn push(self, step: Step) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn chat(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChatResponse, LlmError>> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        let step = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let model = request.model.clone();

        Box::pin(async move {
            match step {
                Some(Step::Say(content)) => Ok(ChatResponse {
                    content,
                    finish_reason: "stop".to_string(),
                    usage: TokenUsage::default(),
                    model,
                }),
                Some(Step::Fail(err)) => Err(err),
                Some(Step::Hang) => std::future::pending().await,
                None => Err(LlmError::ProviderError {
                    status: 500,
                    message: "no scripted reply left".to_string(),
                }),
            }
        })
    }
}
