//! Per-request state machine.
//!
//! ```text
//! Start ──▶ ToolsLoaded ──▶ Routed ──▶ Executed ──▶ ResponseReady
//!   │            │             │           │
//!   └────────────┴─────────────┴───────────┴──────▶ Failed
//! ```
//!
//! Each request gets its own [`RequestState`], advanced one step at a time
//! by [`Orchestrator::advance`] until a terminal step. Steps run strictly in
//! order; concurrency only exists across requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{ErrorKind, ExecutionError};
use crate::executor::TaskExecutor;
use crate::router::{CapabilityRouter, RoutingDecision};
use crate::tools::{ToolRegistry, ToolSet};
use crate::transcript::TranscriptStore;

/// Position of a request in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    ToolsLoaded,
    Routed,
    Executed,
    ResponseReady,
    Failed,
}

impl Step {
    pub fn is_terminal(self) -> bool {
        matches!(self, Step::ResponseReady | Step::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Start => "start",
            Step::ToolsLoaded => "tools_loaded",
            Step::Routed => "routed",
            Step::Executed => "executed",
            Step::ResponseReady => "response_ready",
            Step::Failed => "failed",
        }
    }
}

/// Everything one request accumulates on its way through the pipeline.
#[derive(Debug)]
pub struct RequestState {
    pub session_id: String,
    pub query: String,
    pub step: Step,
    pub tools: Option<ToolSet>,
    pub decision: Option<RoutingDecision>,
    pub tool_result: Option<Value>,
    pub final_text: Option<String>,
    pub error: Option<ExecutionError>,
}

impl RequestState {
    pub fn new(session_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            query: query.into(),
            step: Step::Start,
            tools: None,
            decision: None,
            tool_result: None,
            final_text: None,
            error: None,
        }
    }
}

/// Result of one request, as seen by a transport.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session_id: String,
    /// The answer, or the caller-safe failure message.
    pub text: String,
    /// Terminal step: [`Step::ResponseReady`] or [`Step::Failed`].
    pub step: Step,
    pub error_kind: Option<ErrorKind>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.step == Step::ResponseReady
    }
}

/// Drives requests through registry, router, and executor.
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    router: CapabilityRouter,
    executor: TaskExecutor,
    transcripts: TranscriptStore,
    next_request: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ToolRegistry>,
        router: CapabilityRouter,
        executor: TaskExecutor,
        transcripts: TranscriptStore,
    ) -> Self {
        Self {
            registry,
            router,
            executor,
            transcripts,
            next_request: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    /// Handle one query for `session_id` and return the text to show.
    ///
    /// Never fails: errors end the request in [`Step::Failed`] and the
    /// outcome carries that kind's fixed user message.
    pub async fn run(&self, session_id: &str, query: &str) -> RunOutcome {
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("request", session_id, request_id);

        async move {
            info!(query_len = query.len(), "Request received");
            let mut state = RequestState::new(session_id, query);
            while !state.step.is_terminal() {
                self.advance(&mut state).await;
            }
            self.finish(state)
        }
        .instrument(span)
        .await
    }

    /// Perform exactly one transition.
    pub async fn advance(&self, state: &mut RequestState) {
        let from = state.step;
        let next = match from {
            Step::Start => {
                state.tools = Some(self.registry.ensure_loaded().await);
                Ok(Step::ToolsLoaded)
            }
            Step::ToolsLoaded => match state.tools.as_ref() {
                Some(tools) => {
                    state.decision = Some(self.router.select(&state.query, tools).await);
                    Ok(Step::Routed)
                }
                None => Err(missing("tool set", from)),
            },
            Step::Routed => self.execute(state).await.map(|()| Step::Executed),
            Step::Executed => match state.final_text.as_deref() {
                Some(text) => {
                    self.transcripts.record(&state.session_id, &state.query, text);
                    Ok(Step::ResponseReady)
                }
                None => Err(missing("final text", from)),
            },
            Step::ResponseReady | Step::Failed => {
                Err(ExecutionError::UnexpectedState(format!(
                    "advance called on terminal step {}",
                    from.as_str()
                )))
            }
        };

        match next {
            Ok(step) => {
                debug!(from = from.as_str(), to = step.as_str(), "Transition");
                state.step = step;
            }
            Err(e) => {
                warn!(from = from.as_str(), kind = %e.kind(), error = %e, "Request failed");
                state.error = Some(e);
                state.step = Step::Failed;
            }
        }
    }

    async fn execute(&self, state: &mut RequestState) -> Result<(), ExecutionError> {
        let text = match state.decision.as_ref() {
            Some(RoutingDecision::Tool { tool, arguments }) => {
                let result = self.executor.invoke_tool(tool, arguments.clone()).await?;
                let text = self
                    .executor
                    .summarize_tool_result(&state.query, Some(&result))
                    .await?;
                state.tool_result = Some(result);
                text
            }
            Some(RoutingDecision::Direct) => {
                let history = self.transcripts.history(&state.session_id);
                self.executor.respond_direct(&state.query, &history).await?
            }
            None => return Err(missing("routing decision", Step::Routed)),
        };
        state.final_text = Some(text);
        Ok(())
    }

    fn finish(&self, state: RequestState) -> RunOutcome {
        let error_kind = state.error.as_ref().map(ExecutionError::kind);
        let text = match (state.step, state.final_text) {
            (Step::ResponseReady, Some(text)) => text,
            _ => error_kind
                .unwrap_or(ErrorKind::UnexpectedState)
                .user_message()
                .to_string(),
        };
        info!(step = state.step.as_str(), "Request finished");
        RunOutcome {
            session_id: state.session_id,
            text,
            step: state.step,
            error_kind,
        }
    }
}

fn missing(what: &str, step: Step) -> ExecutionError {
    ExecutionError::UnexpectedState(format!("no {what} at step {}", step.as_str()))
}
