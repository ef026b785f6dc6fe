//! Model Context Protocol integration.
//!
//! [`McpClient`] is an `rmcp` client on the streamable HTTP transport.
//! [`McpToolSource`] adapts it to [`ToolSource`]: every listed tool becomes
//! a [`Tool`] whose async handler issues `tools/call` through the shared
//! client.

mod client;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::BoxFuture;
use crate::tools::{DiscoveryError, Tool, ToolError, ToolSource};

pub use client::{McpClient, McpToolInfo};

/// Errors from the MCP client.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("could not connect to MCP server: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("MCP request timed out after {0}s")]
    Timeout(u64),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },
}

impl From<McpError> for ToolError {
    fn from(err: McpError) -> Self {
        ToolError(err.to_string())
    }
}

impl From<McpError> for DiscoveryError {
    fn from(err: McpError) -> Self {
        DiscoveryError::Failed(err.to_string())
    }
}

/// Discovers tools from an MCP server.
pub struct McpToolSource {
    client: Arc<McpClient>,
}

impl McpToolSource {
    pub fn new(client: McpClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    fn bind(&self, info: McpToolInfo) -> Tool {
        let description = if info.description.trim().is_empty() {
            format!("Tool {}", info.name)
        } else {
            info.description
        };

        let client = Arc::clone(&self.client);
        let name = info.name.clone();
        Tool::new_async(info.name, description, move |args| {
            let client = Arc::clone(&client);
            let name = name.clone();
            Box::pin(async move {
                client
                    .call_tool(&name, Value::Object(args))
                    .await
                    .map_err(ToolError::from)
            })
        })
        .with_schema(info.input_schema)
    }
}

impl ToolSource for McpToolSource {
    fn name(&self) -> &str {
        "mcp"
    }

    fn discover(&self) -> BoxFuture<'_, Result<Vec<Tool>, DiscoveryError>> {
        Box::pin(async move {
            let listed = self.client.list_tools().await?;
            debug!(endpoint = self.client.endpoint(), count = listed.len(), "MCP tools listed");
            Ok(listed
                .into_iter()
                .filter(|info| !info.name.trim().is_empty())
                .map(|info| self.bind(info))
                .collect())
        })
    }
}
