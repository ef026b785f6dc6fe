//! Language-model integration: plain chat completions behind a trait.
//!
//! Two components call the model: the [`crate::router`] (tool selection,
//! structured output) and the [`crate::responder`] (free-text answers and
//! summaries of tool output). Both go through [`LlmProvider`].
//!
//! ```text
//! ┌────────────┐  ┌───────────┐
//! │   Router   │  │ Responder │
//! └─────┬──────┘  └─────┬─────┘
//!       └───────┬───────┘
//!               ▼
//!       ┌──────────────┐
//!       │ LlmProvider  │  (trait)
//!       └──────┬───────┘
//!              ▼
//!       ┌──────────────┐
//!       │    OpenAI    │  (or any compatible endpoint)
//!       └──────────────┘
//! ```

pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::{LlmError, LlmProvider, complete};
pub use types::*;

/// Create an LLM provider from config.
///
/// The caller has already checked that an API key is present.
pub fn create_provider(config: &concierge_config::LlmConfig, api_key: &str) -> OpenAiProvider {
    let mut provider = OpenAiProvider::new(api_key);
    if !config.model.is_empty() {
        provider = provider.with_model(&config.model);
    }
    if let Some(ref base_url) = config.base_url {
        provider = provider.with_base_url(base_url);
    }
    provider
}
