//! A tool source with a fixed catalogue.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use concierge_core::BoxFuture;
use concierge_core::tools::{DiscoveryError, Tool, ToolSource};

/// Serves the same tools on every discovery and counts how often it was
/// asked.
///
/// Failures queued with [`StaticToolSource::fail_next`] are returned before
/// the catalogue, one per discovery call.
pub struct StaticToolSource {
    tools: Vec<Tool>,
    failures: Mutex<Vec<String>>,
    delay: Option<Duration>,
    discoveries: AtomicUsize,
}

impl StaticToolSource {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self {
            tools,
            failures: Mutex::new(Vec::new()),
            delay: None,
            discoveries: AtomicUsize::new(0),
        }
    }

    /// Make the next discovery fail with `message`.
    pub fn fail_next(self, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(0, message.to_string());
        self
    }

    /// Sleep before answering each discovery.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of discovery calls so far.
    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }
}

impl ToolSource for StaticToolSource {
    fn name(&self) -> &str {
        "static"
    }

    fn discover(&self) -> BoxFuture<'_, Result<Vec<Tool>, DiscoveryError>> {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop();

        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(message) => Err(DiscoveryError::Failed(message)),
                None => Ok(self.tools.clone()),
            }
        })
    }
}
