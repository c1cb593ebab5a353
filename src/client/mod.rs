//! Model backend contract and the OpenAI-compatible implementation.
//!
//! Workflows only see [`ModelClient`]; the concrete backend is injected as an
//! `Arc<dyn ModelClient>` when the workflow plan is built.

pub mod openai;
pub mod types;

pub use openai::OpenAiClient;
pub use types::{
    ContentPart, ModelContent, ModelMessage, ModelRequest, ModelResponse, TokenUsage,
};

use crate::Result;
use async_trait::async_trait;

/// One request/response round trip with a chat model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Whether the backend has the credentials it needs.
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse>;
}
