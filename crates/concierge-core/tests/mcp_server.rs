//! The MCP client and tool source against an in-process MCP server.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::post;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use concierge_core::llm::LlmProvider;
use concierge_core::mcp::{McpClient, McpError, McpToolSource};
use concierge_core::tools::{ToolArgs, ToolRegistry, ToolSource};
use concierge_core::{Daemon, Step};
use concierge_test_utils::{ScriptedProvider, TestConfigBuilder};

/// Minimal streamable-HTTP MCP server: JSON for `initialize` and
/// `tools/call`, an event stream for `tools/list`. Only POST is routed, so
/// the standalone GET stream and session DELETE get 405.
#[derive(Default)]
struct FakeMcp {
    initializes: AtomicUsize,
    sessions: AtomicUsize,
    /// Forget the current session on the next request.
    expire_next: AtomicBool,
    methods: Mutex<Vec<String>>,
    live_session: Mutex<Option<String>>,
}

impl FakeMcp {
    fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }
}

async fn handle(
    State(server): State<Arc<FakeMcp>>,
    headers: HeaderMap,
    Json(msg): Json<Value>,
) -> Response {
    let method = msg["method"].as_str().unwrap_or_default().to_string();
    server.methods.lock().unwrap().push(method.clone());
    let id = msg.get("id").cloned().unwrap_or(Value::Null);
    let session = headers
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if method == "initialize" {
        server.initializes.fetch_add(1, Ordering::SeqCst);
        let sid = format!("sess-{}", server.sessions.fetch_add(1, Ordering::SeqCst) + 1);
        *server.live_session.lock().unwrap() = Some(sid.clone());
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": msg["params"]["protocolVersion"],
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "fake-mcp", "version": "0.0.1"},
            },
        });
        return Response::builder()
            .header("content-type", "application/json")
            .header("mcp-session-id", sid)
            .body(Body::from(body.to_string()))
            .unwrap();
    }

    if server.expire_next.swap(false, Ordering::SeqCst) {
        *server.live_session.lock().unwrap() = None;
    }
    if session.is_none() || session != *server.live_session.lock().unwrap() {
        return Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap();
    }

    match method.as_str() {
        "notifications/initialized" => Response::builder()
            .status(StatusCode::ACCEPTED)
            .body(Body::empty())
            .unwrap(),
        "tools/list" => {
            let body = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {"tools": [
                    {"name": "getInterns", "description": "list of interns", "inputSchema": {"type": "object"}},
                    {"name": "getRoom", "inputSchema": {"type": "object", "properties": {"floor": {"type": "integer"}}}},
                    {"name": "", "inputSchema": {"type": "object"}},
                ]},
            });
            Response::builder()
                .header("content-type", "text/event-stream")
                .body(Body::from(format!("event: message\ndata: {body}\n\n")))
                .unwrap()
        }
        "tools/call" => {
            let result = match msg["params"]["name"].as_str() {
                Some("getInterns") => json!({
                    "content": [{"type": "text", "text": "[{\"name\": \"Ada\"}, {\"name\": \"Linus\"}]"}],
                }),
                _ => json!({
                    "content": [{"type": "text", "text": "room service offline"}],
                    "isError": true,
                }),
            };
            Response::builder()
                .header("content-type", "application/json")
                .body(Body::from(json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string()))
                .unwrap()
        }
        _ => Response::builder()
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32601, "message": "method not found"}})
                    .to_string(),
            ))
            .unwrap(),
    }
}

/// Start the fake server and return it with its endpoint URL.
async fn spawn_server() -> (Arc<FakeMcp>, String) {
    let server = Arc::new(FakeMcp::default());
    let app = axum::Router::new()
        .route("/mcp", post(handle))
        .with_state(Arc::clone(&server));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (server, format!("http://{addr}/mcp"))
}

fn client(endpoint: &str) -> McpClient {
    McpClient::new(endpoint, Duration::from_secs(5)).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_handshake_then_list() {
    let (server, endpoint) = spawn_server().await;
    let client = client(&endpoint);

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[0].name, "getInterns");
    assert_eq!(tools[1].description, "");
    assert_eq!(tools[1].input_schema["properties"]["floor"]["type"], "integer");

    assert_eq!(
        server.methods()[..3],
        ["initialize", "notifications/initialized", "tools/list"]
    );
}

#[test_log::test(tokio::test)]
async fn test_session_is_reused() {
    let (server, endpoint) = spawn_server().await;
    let client = client(&endpoint);

    client.list_tools().await.unwrap();
    client.list_tools().await.unwrap();

    assert_eq!(server.initializes.load(Ordering::SeqCst), 1);
}

#[test_log::test(tokio::test)]
async fn test_expired_session_reconnects() {
    let (server, endpoint) = spawn_server().await;
    let client = client(&endpoint);
    client.list_tools().await.unwrap();

    server.expire_next.store(true, Ordering::SeqCst);
    let output = client.call_tool("getInterns", json!({})).await.unwrap();

    assert_eq!(output, json!([{"name": "Ada"}, {"name": "Linus"}]));
    assert_eq!(server.initializes.load(Ordering::SeqCst), 2);
}

#[test_log::test(tokio::test)]
async fn test_tool_error_result() {
    let (_server, endpoint) = spawn_server().await;
    let err = client(&endpoint)
        .call_tool("getRoom", json!({"floor": 2}))
        .await
        .unwrap_err();
    match err {
        McpError::ToolFailed { tool, message } => {
            assert_eq!(tool, "getRoom");
            assert_eq!(message, "room service offline");
        }
        other => panic!("expected ToolFailed, got {other:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn test_source_binds_callable_tools() {
    let (_server, endpoint) = spawn_server().await;
    let source = McpToolSource::new(client(&endpoint));

    let tools = source.discover().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["getInterns", "getRoom"]);
    assert_eq!(tools[1].description, "Tool getRoom");

    let output = tools[0].invoke(ToolArgs::new()).await.unwrap();
    assert_eq!(output[1]["name"], "Linus");
}

#[test_log::test(tokio::test)]
async fn test_registry_over_mcp_discovers_once() {
    let (server, endpoint) = spawn_server().await;
    let registry = ToolRegistry::new(
        Arc::new(McpToolSource::new(client(&endpoint))),
        Duration::from_secs(5),
    );

    let first = registry.ensure_loaded().await;
    let second = registry.ensure_loaded().await;
    assert!(Arc::ptr_eq(&first, &second));

    let lists = server.methods().iter().filter(|m| *m == "tools/list").count();
    assert_eq!(lists, 1);
}

#[test_log::test(tokio::test)]
async fn test_request_routed_to_mcp_tool() {
    let (server, endpoint) = spawn_server().await;
    let config = TestConfigBuilder::new().discovery_url(&endpoint).build();
    let llm = Arc::new(
        ScriptedProvider::new()
            .say(r#"{"selected_tool_name": "getInterns", "extracted_params": {}}"#)
            .say("Ada and Linus are the interns."),
    );
    let provider: Arc<dyn LlmProvider> = llm.clone();
    let source: Arc<dyn ToolSource> = Arc::new(McpToolSource::new(client(&endpoint)));
    let orchestrator = Daemon::with_components(config, provider, Some(source)).build_orchestrator();

    let outcome = orchestrator.run("s1", "who are the interns?").await;

    assert_eq!(outcome.step, Step::ResponseReady);
    assert_eq!(outcome.text, "Ada and Linus are the interns.");
    assert!(server.methods().contains(&"tools/call".to_string()));
    assert_eq!(llm.remaining(), 0);
}
