//! Configuration builders for tests.

use concierge_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// Starts from the defaults with a dummy API key set, so the result passes
/// `require_api_key`.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .listen_port(8081)
///     .discovery_enabled(false)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-test".to_string());
        Self { config }
    }

    pub fn listen_addr(mut self, addr: &str) -> Self {
        self.config.server.listen_addr = addr.to_string();
        self
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.server.listen_port = port;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn api_key(mut self, key: Option<&str>) -> Self {
        self.config.llm.api_key = key.map(str::to_string);
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.config.llm.model = model.to_string();
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm.timeout_secs = secs;
        self
    }

    pub fn discovery_enabled(mut self, enabled: bool) -> Self {
        self.config.discovery.enabled = enabled;
        self
    }

    pub fn discovery_url(mut self, url: &str) -> Self {
        self.config.discovery.base_url = url.to_string();
        self
    }

    pub fn discovery_timeout_secs(mut self, secs: u64) -> Self {
        self.config.discovery.timeout_secs = secs;
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.executor.tool_timeout_secs = secs;
        self
    }

    pub fn max_history_messages(mut self, n: usize) -> Self {
        self.config.sessions.max_history_messages = n;
        self
    }

    pub fn max_sessions(mut self, n: usize) -> Self {
        self.config.sessions.max_sessions = n;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
