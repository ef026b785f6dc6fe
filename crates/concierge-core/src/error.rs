//! Error taxonomy shared by the request pipeline.
//!
//! Discovery and routing failures never leave their component (they degrade
//! to "no tools" and a direct answer). Execution failures end the request in
//! [`crate::Step::Failed`] and are reported to the caller through
//! [`ErrorKind::user_message`], never through the error's own `Display`.

use std::fmt;

use crate::llm::LlmError;

/// Coarse classification of everything that can go wrong in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ToolDiscoveryTimeout,
    ToolDiscoveryFailed,
    RoutingParseFailed,
    ToolMisconfigured,
    ToolInvocationFailed,
    ResponderFailed,
    Timeout,
    UnexpectedState,
}

impl ErrorKind {
    /// The single caller-safe message for a failed request of this kind.
    ///
    /// These strings are fixed; they never embed dependency error text.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::ToolDiscoveryTimeout | ErrorKind::ToolDiscoveryFailed => {
                "The tools I rely on are not reachable right now. Please try again shortly."
            }
            ErrorKind::RoutingParseFailed => {
                "I could not work out how to handle that request. Could you rephrase it?"
            }
            ErrorKind::ToolMisconfigured => {
                "The service needed for this request is not set up correctly. Please contact the administrator."
            }
            ErrorKind::ToolInvocationFailed => {
                "I could not retrieve the information you asked for. Please try again later."
            }
            ErrorKind::ResponderFailed => {
                "I am having trouble composing an answer right now. Please try again in a moment."
            }
            ErrorKind::Timeout => {
                "Your request took too long to complete. Please try again."
            }
            ErrorKind::UnexpectedState => {
                "Something went wrong while processing your request. Please try again."
            }
        }
    }

    /// Stable snake_case label used in logs and API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ToolDiscoveryTimeout => "tool_discovery_timeout",
            ErrorKind::ToolDiscoveryFailed => "tool_discovery_failed",
            ErrorKind::RoutingParseFailed => "routing_parse_failed",
            ErrorKind::ToolMisconfigured => "tool_misconfigured",
            ErrorKind::ToolInvocationFailed => "tool_invocation_failed",
            ErrorKind::ResponderFailed => "responder_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::UnexpectedState => "unexpected_state",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that end a request in the failed state.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("tool '{0}' has no invocation handler")]
    ToolMisconfigured(String),

    #[error("tool '{tool}' failed: {cause}")]
    ToolInvocationFailed { tool: String, cause: String },

    #[error("responder failed: {0}")]
    ResponderFailed(#[source] LlmError),

    #[error("{operation} exceeded its {secs}s deadline")]
    Timeout { operation: String, secs: u64 },

    #[error("unexpected state: {0}")]
    UnexpectedState(String),
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::ToolMisconfigured(_) => ErrorKind::ToolMisconfigured,
            ExecutionError::ToolInvocationFailed { .. } => ErrorKind::ToolInvocationFailed,
            ExecutionError::ResponderFailed(_) => ErrorKind::ResponderFailed,
            ExecutionError::Timeout { .. } => ErrorKind::Timeout,
            ExecutionError::UnexpectedState(_) => ErrorKind::UnexpectedState,
        }
    }

    /// Map a responder-side model error, keeping deadline expiry distinct.
    pub(crate) fn from_responder(err: LlmError, deadline_secs: u64) -> Self {
        match err {
            LlmError::Timeout => ExecutionError::Timeout {
                operation: "responder call".to_string(),
                secs: deadline_secs,
            },
            other => ExecutionError::ResponderFailed(other),
        }
    }
}
