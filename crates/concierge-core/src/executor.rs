//! Runs the capability the router picked.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::ExecutionError;
use crate::llm::ChatMessage;
use crate::responder::Responder;
use crate::tools::{Tool, ToolArgs};

/// Reply used when a tool ran but returned nothing to explain.
pub const NO_DATA_MESSAGE: &str =
    "I reached the right service, but it returned no data for your request. Please try again or rephrase it.";

pub struct TaskExecutor {
    responder: Responder,
    tool_timeout: Duration,
}

impl TaskExecutor {
    pub fn new(responder: Responder, tool_timeout: Duration) -> Self {
        Self {
            responder,
            tool_timeout,
        }
    }

    /// Invoke `tool` under the tool deadline.
    pub async fn invoke_tool(&self, tool: &Tool, args: ToolArgs) -> Result<Value, ExecutionError> {
        info!(tool = %tool.name, args = args.len(), "Invoking tool");
        let started = std::time::Instant::now();

        let result = tokio::time::timeout(self.tool_timeout, tool.invoke(args))
            .await
            .map_err(|_| ExecutionError::Timeout {
                operation: format!("tool '{}'", tool.name),
                secs: self.tool_timeout.as_secs(),
            })??;

        debug!(tool = %tool.name, elapsed_ms = started.elapsed().as_millis() as u64, "Tool returned");
        Ok(result)
    }

    /// Answer without a tool.
    pub async fn respond_direct(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<String, ExecutionError> {
        self.responder
            .respond(query, history)
            .await
            .map_err(|e| self.responder_error(e))
    }

    /// Turn raw tool output into a conversational answer.
    ///
    /// Absent output (`None` or JSON `null`) short-circuits to
    /// [`NO_DATA_MESSAGE`] without a model call.
    pub async fn summarize_tool_result(
        &self,
        query: &str,
        raw: Option<&Value>,
    ) -> Result<String, ExecutionError> {
        let Some(data) = raw.filter(|v| !v.is_null()) else {
            return Ok(NO_DATA_MESSAGE.to_string());
        };
        self.responder
            .summarize(query, data)
            .await
            .map_err(|e| self.responder_error(e))
    }

    fn responder_error(&self, err: crate::llm::LlmError) -> ExecutionError {
        ExecutionError::from_responder(err, self.responder.deadline().as_secs())
    }
}
