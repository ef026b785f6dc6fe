#![deny(unsafe_code)]

//! Configuration loading, environment overrides, and validation for Concierge.
//!
//! Loads TOML configuration files, layers environment variables on top, and
//! validates the result. [`AppConfig`] is the central configuration structure;
//! it is read once at process start and never reloaded.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Placeholder value shipped in sample `.env` files. Treated as "no key".
const API_KEY_PLACEHOLDER: &str = "your_openai_api_key_here";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing required credential: {0}")]
    MissingCredential(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP / WebSocket transport configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tool discovery configuration.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Language-model configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Tool and responder execution limits.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Per-session conversation state.
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// Configuration for the HTTP / WebSocket transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port the server binds to.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Origins allowed by the CORS layer. `"*"` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    8001
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Tool discovery configuration.
///
/// Discovery talks to an MCP server over streamable HTTP. When disabled, the
/// service runs with an empty tool set and answers every request directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Whether tool discovery runs at all.
    #[serde(default = "default_discovery_enabled")]
    pub enabled: bool,

    /// MCP endpoint URL.
    #[serde(default = "default_discovery_base_url")]
    pub base_url: String,

    /// Upper bound on a single discovery attempt, in seconds.
    #[serde(default = "default_discovery_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_discovery_enabled(),
            base_url: default_discovery_base_url(),
            timeout_secs: default_discovery_timeout_secs(),
        }
    }
}

fn default_discovery_enabled() -> bool {
    true
}

fn default_discovery_base_url() -> String {
    "http://localhost:8080/mcp".to_string()
}

fn default_discovery_timeout_secs() -> u64 {
    30
}

/// Language-model configuration (OpenAI-compatible Chat Completions).
///
/// ## TOML Example
///
/// ```toml
/// [llm]
/// model = "gpt-4o-mini"
/// temperature = 0.7
/// base_url = "http://localhost:11434/v1/chat/completions"
/// ```
///
/// The API key is usually supplied through `OPENAI_API_KEY` rather than the
/// file. It is never serialized back out.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key for the provider.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature (0.0–2.0).
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per call.
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// API root for OpenAI-compatible providers, e.g. `http://localhost:11434/v1`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Deadline for a single model call, in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_temperature() -> f32 {
    0.7
}

fn default_llm_max_tokens() -> u32 {
    1024
}

fn default_llm_timeout_secs() -> u64 {
    60
}

/// Execution limits for tool invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Deadline for a single tool invocation, in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    60
}

/// Per-session conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Messages kept per session transcript (oldest dropped first).
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,

    /// Transcripts kept at once; the least recently updated goes first.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_history_messages: default_max_history_messages(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_max_history_messages() -> usize {
    20
}

fn default_max_sessions() -> usize {
    1000
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Recognised variables: `OPENAI_API_KEY`, `CONCIERGE_LLM_MODEL`,
    /// `MCP_BASE_URL`, `MCP_ENABLE_DISCOVERY`, `CONCIERGE_PORT`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("CONCIERGE_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("MCP_BASE_URL") {
            self.discovery.base_url = url;
        }
        if let Some(flag) = lookup("MCP_ENABLE_DISCOVERY") {
            self.discovery.enabled = flag.trim().eq_ignore_ascii_case("true");
            if !self.discovery.enabled {
                tracing::info!("Tool discovery disabled via MCP_ENABLE_DISCOVERY");
            }
        }
        if let Some(port) = lookup("CONCIERGE_PORT") {
            self.server.listen_port = port.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("CONCIERGE_PORT is not a valid port: {port:?}"))
            })?;
        }
        self.validate()
    }

    /// Return the configured API key, or fail if none is usable.
    ///
    /// A missing key is a startup error, never a per-request one.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.llm.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != API_KEY_PLACEHOLDER => Ok(key),
            _ => Err(ConfigError::MissingCredential(
                "llm.api_key (or OPENAI_API_KEY) must be set".to_string(),
            )),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen_port == 0 {
            return Err(ConfigError::Validation(
                "server.listen_port must be non-zero".to_string(),
            ));
        }
        if self.server.listen_addr.is_empty() {
            return Err(ConfigError::Validation(
                "server.listen_addr must not be empty".to_string(),
            ));
        }
        if self.server.cors_origins.iter().any(|o| o.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "server.cors_origins must not contain empty entries".to_string(),
            ));
        }

        if self.discovery.enabled {
            let url = self.discovery.base_url.as_str();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "discovery.base_url must be an http(s) URL, got {url:?}"
                )));
            }
        }
        if self.discovery.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "discovery.timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.model must not be empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be in [0.0, 2.0], got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "llm.max_tokens must be non-zero".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.executor.tool_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "executor.tool_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::Validation(
                "sessions.max_sessions must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1");
        assert_eq!(config.server.listen_port, 8001);
        assert_eq!(config.server.cors_origins, vec!["*".to_string()]);
        assert!(config.discovery.enabled);
        assert_eq!(config.discovery.timeout_secs, 30);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.server.listen_port, 8001);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [server]
            listen_addr = "0.0.0.0"
            listen_port = 9000
            cors_origins = ["http://localhost:4200"]

            [logging]
            level = "debug"

            [discovery]
            enabled = false
            base_url = "http://tools.internal:8080/mcp"
            timeout_secs = 5

            [llm]
            api_key = "sk-test"
            model = "gpt-4o"
            temperature = 0.2
            base_url = "http://localhost:11434/v1/chat/completions"

            [executor]
            tool_timeout_secs = 15

            [sessions]
            max_history_messages = 4
            max_sessions = 50
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0");
        assert_eq!(config.server.listen_port, 9000);
        assert!(!config.discovery.enabled);
        assert_eq!(config.discovery.timeout_secs, 5);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.executor.tool_timeout_secs, 15);
        assert_eq!(config.sessions.max_history_messages, 4);
        assert_eq!(config.sessions.max_sessions, 50);
    }

    #[test]
    fn test_validation_rejects_zero_max_sessions() {
        let result = AppConfig::parse("[sessions]\nmax_sessions = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let result = AppConfig::parse("[server]\nlisten_port = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_non_http_discovery_url() {
        let result = AppConfig::parse("[discovery]\nbase_url = \"localhost:8080\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_disabled_discovery_skips_url_check() {
        let toml = "[discovery]\nenabled = false\nbase_url = \"\"\n";
        assert!(AppConfig::parse(toml).is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_temperature() {
        let result = AppConfig::parse("[llm]\ntemperature = 3.5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeouts() {
        assert!(AppConfig::parse("[discovery]\ntimeout_secs = 0\n").is_err());
        assert!(AppConfig::parse("[llm]\ntimeout_secs = 0\n").is_err());
        assert!(AppConfig::parse("[executor]\ntool_timeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_from(env(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("CONCIERGE_LLM_MODEL", "gpt-4o"),
                ("MCP_BASE_URL", "http://mcp.example:9000/mcp"),
                ("MCP_ENABLE_DISCOVERY", "FALSE"),
                ("CONCIERGE_PORT", "8123"),
            ]))
            .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.discovery.base_url, "http://mcp.example:9000/mcp");
        assert!(!config.discovery.enabled);
        assert_eq!(config.server.listen_port, 8123);
    }

    #[test]
    fn test_env_rejects_bad_port() {
        let mut config = AppConfig::default();
        let result = config.apply_env_from(env(&[("CONCIERGE_PORT", "eighty")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_require_api_key() {
        let mut config = AppConfig::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingCredential(_))
        ));

        config.llm.api_key = Some(API_KEY_PLACEHOLDER.to_string());
        assert!(config.require_api_key().is_err());

        config.llm.api_key = Some("   ".to_string());
        assert!(config.require_api_key().is_err());

        config.llm.api_key = Some("sk-live".to_string());
        assert_eq!(config.require_api_key().unwrap(), "sk-live");
    }

    #[test]
    fn test_api_key_never_serialized_or_debugged() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-very-secret".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("sk-very-secret"));

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("concierge.toml");
        tokio::fs::write(&path, b"[server]\nlisten_port = 4242\n")
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.server.listen_port, 4242);
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/file.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[").await.unwrap();

        let result = AppConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
