use std::future::Future;
use std::time::Duration;

use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo};
use rmcp::service::{Peer, RunningService, ServiceError};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::{RoleClient, serve_client};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::McpError;

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl McpToolInfo {
    fn from_listed(tool: &rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.as_deref().unwrap_or_default().to_string(),
            input_schema: serde_json::to_value(tool.input_schema.as_ref())
                .unwrap_or_else(|_| serde_json::json!({ "type": "object" })),
        }
    }
}

/// Live connection to the server. Dropping it closes the transport.
struct Connection {
    peer: Peer<RoleClient>,
    _service: RunningService<RoleClient, ClientInfo>,
}

/// Client for an MCP server on the streamable HTTP transport.
///
/// The connection (and with it the `initialize` handshake) is made lazily
/// before the first request. When a request fails below the protocol level
/// the connection is dropped and the request is retried once on a fresh one,
/// which covers servers that restart or forget the session.
pub struct McpClient {
    endpoint: String,
    timeout: Duration,
    connection: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl McpClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, McpError> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(McpError::Connect(format!(
                "endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        Ok(Self {
            endpoint,
            timeout,
            connection: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// List the tools the server exposes, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let listed = self
            .with_peer(|peer| async move { peer.list_all_tools().await })
            .await?;
        Ok(listed.iter().map(McpToolInfo::from_listed).collect())
    }

    /// Call a tool and return its output; see [`tool_output`].
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpError> {
        debug!(tool = name, "MCP tools/call");
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            _ => None,
        };
        let result = self
            .with_peer(|peer| {
                let params = CallToolRequestParams {
                    meta: None,
                    name: name.to_string().into(),
                    arguments: arguments.clone(),
                    task: None,
                };
                async move { peer.call_tool(params).await }
            })
            .await?;
        tool_output(name, &result)
    }

    /// Run `op` against the current peer, reconnecting once if the
    /// transport failed.
    async fn with_peer<T, F, Fut>(&self, op: F) -> Result<T, McpError>
    where
        F: Fn(Peer<RoleClient>) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let peer = self.peer().await?;
        match self.bounded(op(peer)).await? {
            Ok(value) => Ok(value),
            Err(ServiceError::McpError(err)) => Err(rpc_error(err)),
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "MCP connection lost, reconnecting");
                *self.connection.lock().await = None;
                let peer = self.peer().await?;
                self.bounded(op(peer)).await?.map_err(service_error)
            }
        }
    }

    async fn peer(&self) -> Result<Peer<RoleClient>, McpError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.peer.clone());
        }
        let conn = self.bounded(self.connect()).await??;
        let peer = conn.peer.clone();
        *guard = Some(conn);
        Ok(peer)
    }

    async fn connect(&self) -> Result<Connection, McpError> {
        let client_info = ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: Default::default(),
            client_info: rmcp::model::Implementation {
                name: "concierge".into(),
                title: Some("Concierge".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
        };
        let transport = StreamableHttpClientTransport::from_config(
            StreamableHttpClientTransportConfig::with_uri(self.endpoint.as_str()),
        );
        let service = serve_client(client_info, transport)
            .await
            .map_err(|e| McpError::Connect(e.to_string()))?;
        info!(endpoint = %self.endpoint, "MCP session initialized");
        Ok(Connection {
            peer: service.peer().clone(),
            _service: service,
        })
    }

    async fn bounded<T>(&self, fut: impl Future<Output = T>) -> Result<T, McpError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| McpError::Timeout(self.timeout.as_secs()))
    }
}

fn rpc_error(err: rmcp::ErrorData) -> McpError {
    McpError::Rpc {
        code: i64::from(err.code.0),
        message: err.message.to_string(),
    }
}

fn service_error(err: ServiceError) -> McpError {
    match err {
        ServiceError::McpError(err) => rpc_error(err),
        other => McpError::Transport(other.to_string()),
    }
}

/// Turn a `tools/call` result into the value handed back to the caller.
///
/// Text content blocks are joined with newlines. When the joined text is
/// itself JSON it is decoded, so callers see structure rather than an
/// escaped string. Without text, structured content is used, then the
/// whole result.
pub(crate) fn tool_output(name: &str, result: &CallToolResult) -> Result<Value, McpError> {
    let texts: Vec<String> = result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.to_string()))
        .collect();

    if result.is_error == Some(true) {
        let message = if texts.is_empty() {
            "tool reported an error".to_string()
        } else {
            texts.join("\n")
        };
        return Err(McpError::ToolFailed {
            tool: name.to_string(),
            message,
        });
    }

    if texts.is_empty() {
        if let Some(structured) = &result.structured_content {
            return Ok(structured.clone());
        }
        return serde_json::to_value(result).map_err(|e| McpError::Transport(e.to_string()));
    }

    let text = texts.join("\n");
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
