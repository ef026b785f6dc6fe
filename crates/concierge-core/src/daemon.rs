//! Service wiring, startup, and shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use concierge_config::{AppConfig, ConfigError};

use crate::executor::TaskExecutor;
use crate::llm::{CompletionSettings, LlmProvider, create_provider};
use crate::mcp::{McpClient, McpError, McpToolSource};
use crate::orchestrator::Orchestrator;
use crate::responder::Responder;
use crate::router::CapabilityRouter;
use crate::server::{self, AppState, ServerError};
use crate::tools::{ToolRegistry, ToolSource};
use crate::transcript::TranscriptStore;

/// Shutdown signal sent via broadcast channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal;

/// The Concierge service: configuration plus the collaborators it talks to.
pub struct Daemon {
    config: AppConfig,
    llm: Arc<dyn LlmProvider>,
    source: Option<Arc<dyn ToolSource>>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl Daemon {
    /// Build the daemon with the OpenAI provider and, when discovery is
    /// enabled, the MCP tool source.
    ///
    /// Fails when no API key is configured.
    pub fn from_config(config: AppConfig) -> Result<Self, DaemonError> {
        let api_key = config.require_api_key()?;
        let llm: Arc<dyn LlmProvider> = Arc::new(create_provider(&config.llm, api_key));

        let source: Option<Arc<dyn ToolSource>> = if config.discovery.enabled {
            let client = McpClient::new(
                &config.discovery.base_url,
                Duration::from_secs(config.executor.tool_timeout_secs),
            )?;
            Some(Arc::new(McpToolSource::new(client)))
        } else {
            info!("Tool discovery disabled");
            None
        };

        Ok(Self::with_components(config, llm, source))
    }

    /// Build the daemon around caller-supplied collaborators.
    pub fn with_components(
        config: AppConfig,
        llm: Arc<dyn LlmProvider>,
        source: Option<Arc<dyn ToolSource>>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            llm,
            source,
            shutdown_tx,
        }
    }

    /// Assemble the request pipeline.
    pub fn build_orchestrator(&self) -> Orchestrator {
        let registry = match &self.source {
            Some(source) => ToolRegistry::new(
                Arc::clone(source),
                Duration::from_secs(self.config.discovery.timeout_secs),
            ),
            None => ToolRegistry::disabled(),
        };

        let llm_deadline = Duration::from_secs(self.config.llm.timeout_secs);
        let settings = CompletionSettings::from_config(&self.config.llm);
        // Routing wants a deterministic JSON decision.
        let routing_settings = CompletionSettings {
            temperature: 0.0,
            ..settings.clone()
        };

        Orchestrator::new(
            Arc::new(registry),
            CapabilityRouter::new(Arc::clone(&self.llm), routing_settings, llm_deadline),
            TaskExecutor::new(
                Responder::new(Arc::clone(&self.llm), settings, llm_deadline),
                Duration::from_secs(self.config.executor.tool_timeout_secs),
            ),
            TranscriptStore::new(
                self.config.sessions.max_history_messages,
                self.config.sessions.max_sessions,
            ),
        )
    }

    /// Serve HTTP and WebSocket traffic until shutdown or Ctrl-C.
    pub async fn run(&self) -> Result<(), DaemonError> {
        let addr = format!(
            "{}:{}",
            self.config.server.listen_addr, self.config.server.listen_port
        );
        let listener = TcpListener::bind(&addr).await?;
        self.run_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> Result<(), DaemonError> {
        let local: SocketAddr = listener.local_addr()?;
        info!(
            addr = %local,
            version = %crate::build_info::version_string(),
            model = %self.config.llm.model,
            discovery = self.source.is_some(),
            "Concierge starting"
        );

        let state = Arc::new(AppState::new(Arc::new(self.build_orchestrator())));
        let app = server::router(state, &self.config.server.cors_origins)?;

        let shutdown_tx = self.shutdown_tx.clone();
        let ctrl_c = async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, initiating graceful shutdown");
                let _ = shutdown_tx.send(ShutdownSignal);
            }
        };

        let serve = server::serve(listener, app, self.shutdown_tx.subscribe());
        tokio::select! {
            result = serve => result?,
            _ = ctrl_c => {},
        }

        info!("Concierge stopped");
        Ok(())
    }

    /// Request a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(ShutdownSignal);
    }

    /// Get a reference to the daemon's configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Errors from daemon startup and runtime.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("tool client setup failed: {0}")]
    Mcp(#[from] McpError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;

    fn config_with_key() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-test".to_string());
        config
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let result = Daemon::from_config(AppConfig::default());
        assert!(matches!(
            result,
            Err(DaemonError::Config(ConfigError::MissingCredential(_)))
        ));
    }

    #[test]
    fn test_from_config_with_key() {
        let daemon = Daemon::from_config(config_with_key()).unwrap();
        assert_eq!(daemon.config().server.listen_port, 8001);
        assert!(daemon.source.is_some());
    }

    #[test]
    fn test_discovery_disabled_has_no_source() {
        let mut config = config_with_key();
        config.discovery.enabled = false;
        let daemon = Daemon::from_config(config).unwrap();
        assert!(daemon.source.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let daemon = Arc::new(Daemon::with_components(
            config_with_key(),
            Arc::new(ScriptedLlm::texts(&[])),
            None,
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let runner = Arc::clone(&daemon);
        let handle = tokio::spawn(async move { runner.run_on(listener).await });

        // Let the server subscribe before signalling.
        tokio::time::sleep(Duration::from_millis(50)).await;
        daemon.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
