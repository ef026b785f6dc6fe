//! Model-driven tool selection.
//!
//! The router shows the model the tool manifest (names, descriptions and
//! declared parameters) and asks for a strict JSON decision:
//!
//! ```json
//! {"selected_tool_name": "getInterns", "extracted_params": {"team": "core"}}
//! ```
//!
//! `"none"` means no tool applies. Anything the router cannot use (bad
//! JSON, an unknown name, a failed or late model call) becomes
//! [`RoutingDecision::Direct`]; `select` itself never fails.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ErrorKind;
use crate::llm::{ChatMessage, ChatRequest, CompletionSettings, LlmProvider, complete};
use crate::structured::parse_json_object;
use crate::tools::{Tool, ToolArgs};

/// Value of `selected_tool_name` meaning "answer directly".
pub const NO_TOOL: &str = "none";

/// Outcome of routing one query.
#[derive(Debug, Clone)]
pub enum RoutingDecision {
    /// Use the generic responder.
    Direct,
    /// Invoke `tool` with `arguments`. The tool is always one of the tools
    /// passed to [`CapabilityRouter::select`].
    Tool { tool: Arc<Tool>, arguments: ToolArgs },
}

impl RoutingDecision {
    pub fn is_direct(&self) -> bool {
        matches!(self, RoutingDecision::Direct)
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            RoutingDecision::Direct => None,
            RoutingDecision::Tool { tool, .. } => Some(&tool.name),
        }
    }
}

pub struct CapabilityRouter {
    llm: Arc<dyn LlmProvider>,
    settings: CompletionSettings,
    deadline: Duration,
}

impl CapabilityRouter {
    pub fn new(llm: Arc<dyn LlmProvider>, settings: CompletionSettings, deadline: Duration) -> Self {
        Self {
            llm,
            settings,
            deadline,
        }
    }

    /// Decide how to handle `query` given the available `tools`.
    ///
    /// No model call is made when there are no tools or the query is blank.
    pub async fn select(&self, query: &str, tools: &[Arc<Tool>]) -> RoutingDecision {
        let query = query.trim();
        if tools.is_empty() || query.is_empty() {
            return RoutingDecision::Direct;
        }

        let request = ChatRequest::new(
            &self.settings,
            routing_prompt(tools),
            vec![ChatMessage::user(format!("User request: \"{query}\""))],
        );

        let raw = match complete(self.llm.as_ref(), &request, self.deadline).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(kind = %ErrorKind::RoutingParseFailed, error = %e, "Routing call failed, answering directly");
                return RoutingDecision::Direct;
            }
        };
        debug!(raw = %raw, "Routing reply");

        match parse_decision(&raw, tools) {
            Ok(decision) => decision,
            Err(reason) => {
                warn!(kind = %ErrorKind::RoutingParseFailed, reason, "Unusable routing reply, answering directly");
                RoutingDecision::Direct
            }
        }
    }
}

fn routing_prompt(tools: &[Arc<Tool>]) -> String {
    let mut manifest = String::new();
    for tool in tools {
        let _ = writeln!(manifest, "- {}: {}", tool.name, tool.description);
        if let Some(params) = parameters_line(&tool.input_schema) {
            let _ = writeln!(manifest, "  parameters: {params}");
        }
    }
    format!(
        "You select the most appropriate tool from a list to answer the user's request.\n\
         Your reply MUST be a single JSON object with the key \"selected_tool_name\" holding the \
         exact name of the chosen tool, or \"{NO_TOOL}\" if no tool fits.\n\
         If a tool fits, also include \"extracted_params\": an object with the parameters the tool \
         needs, taken from the user's request (use {{}} when none are needed or none can be \
         extracted).\n\
         Do not add any explanation outside the JSON object.\n\n\
         Available tools:\n{manifest}"
    )
}

/// Compact view of a JSON Schema's `properties`, plus its `required` list.
/// `None` when the tool takes no declared parameters.
fn parameters_line(schema: &Value) -> Option<String> {
    let properties = schema.get("properties")?.as_object()?;
    if properties.is_empty() {
        return None;
    }
    let mut line = Value::Object(properties.clone()).to_string();
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !required.is_empty() {
        let _ = write!(line, " (required: {})", required.join(", "));
    }
    Some(line)
}

/// Interpret the model's reply against the current tool list.
///
/// `Err` carries a short reason for the log line; callers treat it as
/// [`RoutingDecision::Direct`].
fn parse_decision(raw: &str, tools: &[Arc<Tool>]) -> Result<RoutingDecision, &'static str> {
    let mut reply = parse_json_object(raw).ok_or("reply is not a JSON object")?;

    let name = match reply.get("selected_tool_name") {
        Some(Value::String(name)) => name.trim(),
        Some(Value::Null) | None => return Err("reply has no selected_tool_name"),
        Some(_) => return Err("selected_tool_name is not a string"),
    };
    if name.is_empty() || name.eq_ignore_ascii_case(NO_TOOL) {
        return Ok(RoutingDecision::Direct);
    }

    let tool = tools
        .iter()
        .find(|t| t.name == name)
        .ok_or("selected tool is not available")?;

    let arguments = match reply.remove("extracted_params") {
        Some(Value::Object(map)) => map,
        _ => ToolArgs::new(),
    };

    Ok(RoutingDecision::Tool {
        tool: Arc::clone(tool),
        arguments,
    })
}
