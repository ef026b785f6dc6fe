use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::BoxFuture;
use crate::error::ErrorKind;

use super::Tool;

/// Snapshot of discovered tools in registration order.
pub type ToolSet = Arc<Vec<Arc<Tool>>>;

/// Why a discovery attempt produced no tools.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery did not finish within {0}s")]
    Timeout(u64),

    #[error("discovery failed: {0}")]
    Failed(String),
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiscoveryError::Timeout(_) => ErrorKind::ToolDiscoveryTimeout,
            DiscoveryError::Failed(_) => ErrorKind::ToolDiscoveryFailed,
        }
    }
}

/// Something that can list the tools currently on offer.
pub trait ToolSource: Send + Sync {
    /// Short label for logs (e.g. "mcp").
    fn name(&self) -> &str;

    /// List the available tools with their handlers bound.
    fn discover(&self) -> BoxFuture<'_, Result<Vec<Tool>, DiscoveryError>>;
}

/// Lazily populated, process-lifetime cache of discovered tools.
///
/// The first [`ensure_loaded`](Self::ensure_loaded) call runs discovery;
/// later calls return the same snapshot. A failed or empty discovery leaves
/// the cache unpopulated, so the next request tries again. There is no
/// refresh: tools added to or removed from the source after a successful
/// load are not seen until restart.
pub struct ToolRegistry {
    source: Option<Arc<dyn ToolSource>>,
    timeout: Duration,
    cache: Mutex<Option<ToolSet>>,
}

impl ToolRegistry {
    pub fn new(source: Arc<dyn ToolSource>, timeout: Duration) -> Self {
        Self {
            source: Some(source),
            timeout,
            cache: Mutex::new(None),
        }
    }

    /// A registry that never discovers anything.
    pub fn disabled() -> Self {
        Self {
            source: None,
            timeout: Duration::ZERO,
            cache: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Return the cached tools, discovering them first if needed.
    ///
    /// Never fails: any discovery problem yields an empty set. The lock is
    /// held across discovery so concurrent callers wait for the one
    /// in-flight attempt instead of starting their own.
    pub async fn ensure_loaded(&self) -> ToolSet {
        let Some(source) = &self.source else {
            return ToolSet::default();
        };

        let mut cache = self.cache.lock().await;
        if let Some(tools) = cache.as_ref() {
            return Arc::clone(tools);
        }

        match self.discover(source.as_ref()).await {
            Ok(tools) => {
                info!(source = source.name(), count = tools.len(), "Tools loaded");
                let tools: ToolSet = Arc::new(tools);
                *cache = Some(Arc::clone(&tools));
                tools
            }
            Err(e) => {
                warn!(source = source.name(), kind = %e.kind(), error = %e, "Tool discovery failed");
                ToolSet::default()
            }
        }
    }

    /// Whether a successful discovery has populated the cache.
    pub async fn is_loaded(&self) -> bool {
        self.cache.lock().await.is_some()
    }

    async fn discover(&self, source: &dyn ToolSource) -> Result<Vec<Arc<Tool>>, DiscoveryError> {
        debug!(source = source.name(), timeout_secs = self.timeout.as_secs(), "Discovering tools");

        let found = tokio::time::timeout(self.timeout, source.discover())
            .await
            .map_err(|_| DiscoveryError::Timeout(self.timeout.as_secs()))??;

        let mut seen = HashSet::new();
        let mut tools = Vec::with_capacity(found.len());
        for tool in found {
            if seen.insert(tool.name.clone()) {
                tools.push(Arc::new(tool));
            } else {
                warn!(tool = %tool.name, "Duplicate tool name, keeping the first");
            }
        }

        if tools.is_empty() {
            return Err(DiscoveryError::Failed("source returned no tools".to_string()));
        }
        Ok(tools)
    }
}
