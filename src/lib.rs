//! # chat-workflows
//!
//! Streaming workflow orchestrator for AI chat-completion endpoints.
//!
//! ## Overview
//!
//! Each request runs a small pipeline (model call, optional tool call, result
//! analysis or formatting) on its own task and streams what it produces as a
//! single ordered sequence of [`WorkflowEvent`]s: status updates, text,
//! structured payloads such as generated images, and exactly one terminal
//! `Complete` or `ErrorText`. The HTTP layer turns that sequence into
//! Server-Sent Events.
//!
//! Failures are reported in-band: once the stream has started, every error
//! becomes one `ErrorText` event carrying a machine-readable
//! [`ErrorKind`](error::ErrorKind).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chat_workflows::config::Settings;
//! use chat_workflows::workflow::{Backends, Workflows};
//! use chat_workflows::{ChatRequest, Message};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> chat_workflows::Result<()> {
//!     let settings = Settings::load()?;
//!     let workflows = Workflows::build(&settings, Backends::from_settings(&settings)?)?;
//!
//!     let request = ChatRequest::new(vec![Message::user("Nudeln, Tomaten, Käse")]);
//!     if let Some(recipe) = workflows.get("recipe") {
//!         let mut events = recipe.start(request);
//!         while let Some(event) = events.next().await {
//!             println!("{}", event.to_wire());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Requests, events and their wire framing, tool calls |
//! | [`workflow`] | Orchestrator state machine, steps, built-in workflows |
//! | [`tools`] | Tool registry/dispatcher and the built-in tools |
//! | [`client`] | Model backend contract and OpenAI-compatible client |
//! | [`structured`] | Response schemas and tool-argument validation |
//! | [`transport`] | Outbound HTTP helpers |
//! | [`server`] | axum SSE endpoints |
//! | [`config`] | Settings from YAML and environment |

pub mod client;
pub mod config;
pub mod server;
pub mod structured;
pub mod tools;
pub mod transport;
pub mod types;
pub mod utils;
pub mod workflow;

pub use client::ModelClient;
pub use tools::{ToolDefinition, ToolHandler, ToolRegistry};
pub use types::{
    events::{GeneratedImage, WorkflowEvent},
    message::{ChatRequest, Message, MessageRole},
    tool::ToolCall,
};
pub use workflow::{EventSink, Orchestrator, WorkflowPlan, WorkflowStep};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
