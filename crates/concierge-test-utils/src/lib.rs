#![deny(unsafe_code)]

//! Shared test utilities for the Concierge workspace.
//!
//! Fakes for the two external collaborators (the language model and the
//! tool server), config builders, and tracing helpers, so integration tests
//! can drive the whole pipeline without a network.
//!
//! ```toml
//! [dev-dependencies]
//! concierge-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod llm;
pub mod tools;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use llm::ScriptedProvider;
pub use tools::StaticToolSource;
