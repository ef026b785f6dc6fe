//! The WebSocket API served by a running daemon, driven by a real client.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use concierge_core::Daemon;
use concierge_core::llm::LlmProvider;
use concierge_core::message::{Envelope, EnvelopeKind};
use concierge_core::server::{EMPTY_QUERY_MESSAGE, HealthResponse};
use concierge_test_utils::{ScriptedProvider, TestConfigBuilder};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Running {
    daemon: Arc<Daemon>,
    addr: String,
    handle: tokio::task::JoinHandle<()>,
}

async fn start(llm: ScriptedProvider) -> Running {
    let config = TestConfigBuilder::new().discovery_enabled(false).build();
    let llm: Arc<dyn LlmProvider> = Arc::new(llm);
    let daemon = Arc::new(Daemon::with_components(config, llm, None));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let runner = Arc::clone(&daemon);
    let handle = tokio::spawn(async move {
        runner.run_on(listener).await.unwrap();
    });

    Running { daemon, addr, handle }
}

impl Running {
    async fn connect(&self, session_id: &str) -> Socket {
        let url = format!("ws://{}/ws?session_id={session_id}", self.addr);
        let (socket, _) = connect_async(url.as_str()).await.unwrap();
        socket
    }

    async fn health(&self) -> HealthResponse {
        reqwest::get(format!("http://{}/health", self.addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Poll `/health` until `done` holds, giving the server time to notice
    /// closed sockets.
    async fn wait_for_health(&self, done: impl Fn(&HealthResponse) -> bool) -> HealthResponse {
        for _ in 0..250 {
            let health = self.health().await;
            if done(&health) {
                return health;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("health never settled: {:?}", self.health().await);
    }

    async fn stop(self) {
        self.daemon.shutdown();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .unwrap()
            .unwrap();
    }
}

async fn next_envelope(socket: &mut Socket) -> Envelope {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("no frame within 5s")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[test_log::test(tokio::test)]
async fn test_query_gets_processing_then_response() {
    let server = start(ScriptedProvider::new().say("Hi from the socket.")).await;
    let mut socket = server.connect("tab-1").await;

    socket.send(Message::text("hello")).await.unwrap();

    let first = next_envelope(&mut socket).await;
    assert_eq!(first.kind, EnvelopeKind::Processing);
    assert_eq!(first.session_id, "tab-1");
    let second = next_envelope(&mut socket).await;
    assert_eq!(second.kind, EnvelopeKind::Response);
    assert_eq!(second.body, "Hi from the socket.");

    let open = server.health().await;
    assert_eq!(open.open_sessions, 1);
    assert_eq!(open.transcript_sessions, 1);

    socket.close(None).await.unwrap();
    let closed = server
        .wait_for_health(|h| h.open_sessions == 0 && h.transcript_sessions == 0)
        .await;
    assert_eq!(closed.open_sessions, 0);

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_empty_json_query_is_rejected() {
    let server = start(ScriptedProvider::new()).await;
    let mut socket = server.connect("tab-1").await;

    socket.send(Message::text(r#"{"query": "  "}"#)).await.unwrap();

    let envelope = next_envelope(&mut socket).await;
    assert_eq!(envelope.kind, EnvelopeKind::Error);
    assert_eq!(envelope.body, EMPTY_QUERY_MESSAGE);

    socket.close(None).await.unwrap();
    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_closed_sessions_leave_no_transcripts() {
    let mut llm = ScriptedProvider::new();
    for i in 0..20 {
        llm = llm.say(format!("answer {i}"));
    }
    let server = start(llm).await;

    for i in 0..20 {
        let mut socket = server.connect(&format!("tab-{i}")).await;
        socket.send(Message::text("hello")).await.unwrap();
        assert_eq!(next_envelope(&mut socket).await.kind, EnvelopeKind::Processing);
        assert_eq!(next_envelope(&mut socket).await.body, format!("answer {i}"));
        socket.close(None).await.unwrap();
    }

    server
        .wait_for_health(|h| h.open_sessions == 0 && h.transcript_sessions == 0)
        .await;
    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_shared_session_id_replies_to_asker() {
    let server = start(ScriptedProvider::new().say("For the first tab.")).await;
    let mut first = server.connect("shared").await;
    let mut second = server.connect("shared").await;
    server.wait_for_health(|h| h.open_sessions == 1).await;

    first.send(Message::text("hello")).await.unwrap();
    assert_eq!(next_envelope(&mut first).await.kind, EnvelopeKind::Processing);
    let answer = next_envelope(&mut first).await;
    assert_eq!(answer.kind, EnvelopeKind::Response);
    assert_eq!(answer.body, "For the first tab.");

    let stray = tokio::time::timeout(Duration::from_millis(200), second.next()).await;
    assert!(stray.is_err(), "second connection got {stray:?}");

    // The first connection no longer owns the id, so its close keeps the
    // history the newer connection now continues.
    first.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let health = server.health().await;
    assert_eq!(health.open_sessions, 1);
    assert_eq!(health.transcript_sessions, 1);

    second.close(None).await.unwrap();
    server
        .wait_for_health(|h| h.open_sessions == 0 && h.transcript_sessions == 0)
        .await;
    server.stop().await;
}
