//! Generic conversational responder.
//!
//! Answers queries no tool handles, and turns raw tool output into prose.
//! Before a direct answer the query's intent is classified by keyword
//! matching (no model call); the intent picks the system prompt.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::llm::{ChatMessage, ChatRequest, CompletionSettings, LlmError, LlmProvider, complete};

/// What kind of answer a query calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Calculation, analysis, step-by-step explanation.
    Analytical,
    Greeting,
    Question,
    General,
}

// Checked in this order; the first intent with a hit wins.
const ANALYTICAL: &[&str] = &[
    "calculate",
    "compute",
    "solve",
    "analyze",
    "analyse",
    "reason",
    "explain why",
    "calcola",
    "risolvi",
    "analizza",
    "ragiona",
    "spiega perché",
];

const GREETING: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "how are you",
    "ciao",
    "salve",
    "buongiorno",
    "come stai",
];

const QUESTION: &[&str] = &[
    "what", "how", "when", "where", "why", "who", "which", "cosa", "come", "quando", "dove",
    "perché", "chi", "quale",
];

impl Intent {
    /// Classify a query. Deterministic; case and punctuation are ignored and
    /// keywords only match whole words.
    pub fn classify(query: &str) -> Self {
        let words = normalize(query);
        let hit = |keywords: &[&str]| keywords.iter().any(|k| contains_phrase(&words, k));

        if hit(ANALYTICAL) {
            Intent::Analytical
        } else if hit(GREETING) {
            Intent::Greeting
        } else if hit(QUESTION) {
            Intent::Question
        } else {
            Intent::General
        }
    }

    /// Whether the answer should walk through its reasoning.
    pub fn needs_reasoning(self) -> bool {
        matches!(self, Intent::Analytical | Intent::Question)
    }

    fn system_prompt(self) -> &'static str {
        if self.needs_reasoning() {
            REASONING_PROMPT
        } else {
            CONVERSATIONAL_PROMPT
        }
    }
}

fn normalize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .flat_map(|w| w.split('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    !needle.is_empty()
        && words
            .windows(needle.len())
            .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}

const CONVERSATIONAL_PROMPT: &str = "\
You are a friendly, helpful assistant. Answer naturally and conversationally.
Keep answers concise but informative, with a warm and professional tone.
Always reply in the language the user writes in.";

const REASONING_PROMPT: &str = "\
You are an assistant skilled at analysis and reasoning. When you receive a question:
1. Read the request carefully.
2. Break the problem into smaller parts if needed.
3. Reason through it step by step.
4. Give clear, detailed explanations.
5. Finish with a complete, well-structured answer.

For complex answers use this layout:
**Analysis:** your reading of the problem
**Reasoning:** the logical steps
**Conclusion:** the final answer, clear and concise

Always reply in the language the user writes in.";

const SUMMARY_PROMPT: &str = "\
You turn raw JSON data into a friendly, conversational answer.
The user message is a JSON object with two fields: `original_query`, what the \
user asked, and `tool_data`, the data retrieved for them.
Using the original request and the data, give the user a clear, useful answer.
Interpret the data and present it naturally. If it is a list, describe what it \
represents and draw conclusions where possible. If it is an object, explain its \
main properties. If the data is empty or not useful, say so and explain why.
Do not mention JSON, tools, services, or how the data was obtained.
Always reply in the language of the original query.";

/// Model-backed responder.
pub struct Responder {
    llm: Arc<dyn LlmProvider>,
    settings: CompletionSettings,
    deadline: Duration,
}

impl Responder {
    pub fn new(llm: Arc<dyn LlmProvider>, settings: CompletionSettings, deadline: Duration) -> Self {
        Self {
            llm,
            settings,
            deadline,
        }
    }

    /// Deadline applied to each model call.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Answer `query` directly, with earlier turns of the conversation as
    /// context.
    pub async fn respond(&self, query: &str, history: &[ChatMessage]) -> Result<String, LlmError> {
        let intent = Intent::classify(query);
        debug!(?intent, history = history.len(), "Responding directly");

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(query));

        let request = ChatRequest::new(&self.settings, intent.system_prompt(), messages);
        complete(self.llm.as_ref(), &request, self.deadline).await
    }

    /// Explain tool output to the user in plain language.
    pub async fn summarize(&self, query: &str, data: &Value) -> Result<String, LlmError> {
        let payload = serde_json::json!({
            "original_query": query,
            "tool_data": data,
        });
        let body =
            serde_json::to_string_pretty(&payload).map_err(|e| LlmError::Parse(e.to_string()))?;

        let request = ChatRequest::new(&self.settings, SUMMARY_PROMPT, vec![ChatMessage::user(body)]);
        complete(self.llm.as_ref(), &request, self.deadline).await
    }
}
