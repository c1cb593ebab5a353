//! Core type definitions: requests, events and tool calls.

pub mod events;
pub mod message;
pub mod tool;

pub use events::{GeneratedImage, WorkflowEvent};
pub use message::{ChatRequest, Message, MessageRole};
pub use tool::{FunctionSpec, ToolCall, ToolSpec};
