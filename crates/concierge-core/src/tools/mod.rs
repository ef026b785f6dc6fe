//! Tools: externally discovered capabilities the router can pick.
//!
//! A [`Tool`] carries a name, a description (shown to the model when it
//! routes), an input schema, and a [`ToolHandler`] resolved once when the
//! tool is registered. Handlers come in two shapes:
//!
//! - [`ToolHandler::Async`]: awaited on the calling task
//! - [`ToolHandler::Blocking`]: moved onto tokio's blocking pool so a slow
//!   call never stalls the runtime workers
//!
//! A tool listed without a handler is kept (it still shows up in `/tools`),
//! but invoking it is [`ExecutionError::ToolMisconfigured`].

mod registry;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::BoxFuture;
use crate::error::ExecutionError;

pub use registry::{DiscoveryError, ToolRegistry, ToolSet, ToolSource};

/// Argument map passed to a tool.
pub type ToolArgs = Map<String, Value>;

/// Failure reported by a tool handler.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

type AsyncFn = dyn Fn(ToolArgs) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync;
type BlockingFn = dyn Fn(ToolArgs) -> Result<Value, ToolError> + Send + Sync;

/// How a tool is invoked.
#[derive(Clone)]
pub enum ToolHandler {
    Async(Arc<AsyncFn>),
    Blocking(Arc<BlockingFn>),
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolHandler::Async(_) => f.write_str("Async"),
            ToolHandler::Blocking(_) => f.write_str("Blocking"),
        }
    }
}

/// A named capability with an optional invocation handler.
#[derive(Debug, Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments, as advertised by the tool source.
    pub input_schema: Value,
    handler: Option<ToolHandler>,
}

impl Tool {
    /// A tool backed by an async handler.
    pub fn new_async<F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ToolArgs) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_schema(),
            handler: Some(ToolHandler::Async(Arc::new(handler))),
        }
    }

    /// A tool backed by a synchronous, possibly blocking, handler.
    pub fn new_blocking<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArgs) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_schema(),
            handler: Some(ToolHandler::Blocking(Arc::new(handler))),
        }
    }

    /// A listed tool with no way to call it.
    pub fn unbound(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_schema(),
            handler: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn handler(&self) -> Option<&ToolHandler> {
        self.handler.as_ref()
    }

    /// Call the tool.
    ///
    /// Handler errors and panics in blocking handlers both surface as
    /// [`ExecutionError::ToolInvocationFailed`].
    pub async fn invoke(&self, args: ToolArgs) -> Result<Value, ExecutionError> {
        let result = match &self.handler {
            None => return Err(ExecutionError::ToolMisconfigured(self.name.clone())),
            Some(ToolHandler::Async(call)) => call(args).await,
            Some(ToolHandler::Blocking(call)) => {
                let call = Arc::clone(call);
                tokio::task::spawn_blocking(move || call(args))
                    .await
                    .map_err(|e| self.invocation_failed(format!("blocking task aborted: {e}")))?
            }
        };
        result.map_err(|e| self.invocation_failed(e.0))
    }

    fn invocation_failed(&self, cause: String) -> ExecutionError {
        ExecutionError::ToolInvocationFailed {
            tool: self.name.clone(),
            cause,
        }
    }
}

fn empty_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}
