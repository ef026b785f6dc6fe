#![deny(unsafe_code)]

//! Concierge core runtime.
//!
//! Routes a free-text request either to a dynamically discovered tool or to a
//! generic conversational responder, and returns one natural-language answer.
//! The pieces, leaf first:
//!
//! - [`tools`] discovers and caches invokable tools (single-flight, process lifetime)
//! - [`router`] asks the language model whether a tool applies and with which arguments
//! - [`executor`] invokes the tool or the responder and turns raw tool output into prose
//! - [`orchestrator`] drives one request through an explicit state machine
//!
//! [`server`] and [`daemon`] expose the orchestrator over HTTP and WebSocket.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future, used as the return type of async
/// trait methods that require dynamic dispatch (`dyn Trait`).
///
/// Native `async fn` in traits produces opaque return types that are **not**
/// object-safe. Traits consumed via `Arc<dyn Trait>` must return a concrete
/// `Pin<Box<dyn Future>>` instead. This alias keeps those signatures readable.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Service wiring, startup, and shutdown.
pub mod daemon;
/// Error taxonomy and user-facing failure messages.
pub mod error;
/// Tool and responder invocation.
pub mod executor;
/// Language-model provider integration.
pub mod llm;
/// Model Context Protocol client used for tool discovery and invocation.
pub mod mcp;
/// Outbound session envelopes.
pub mod message;
/// Per-request state machine.
pub mod orchestrator;
/// Generic conversational responder and intent classification.
pub mod responder;
/// Model-driven tool selection.
pub mod router;
/// Zeroizing wrapper for credentials.
pub mod secret;
/// HTTP and WebSocket transport.
pub mod server;
/// Session channel registry.
pub mod session;
/// Parsing of structured model output.
pub mod structured;
/// Tool definitions, handlers, and the discovery registry.
pub mod tools;
/// In-memory conversation transcripts.
pub mod transcript;

#[cfg(test)]
pub(crate) mod test_support;

pub use daemon::Daemon;
pub use error::{ErrorKind, ExecutionError};
pub use orchestrator::{Orchestrator, RunOutcome, Step};
pub use router::{CapabilityRouter, RoutingDecision};
pub use tools::{Tool, ToolRegistry, ToolSet, ToolSource};
