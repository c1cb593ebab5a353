use super::EventSink;
use crate::client::ModelResponse;
use crate::types::{ChatRequest, ToolCall};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// What a step wants the orchestrator to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Fall through to the next step or state.
    Continue,
    /// Skip remaining work and complete successfully.
    Finish,
}

/// Mutable state threaded through one pipeline run.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub request: Arc<ChatRequest>,
    /// Content of the most recent message.
    pub input: String,
    pub model_response: Option<ModelResponse>,
    /// The one tool call selected for dispatch.
    pub tool_call: Option<ToolCall>,
    pub tool_result: Option<Value>,
}

impl StepContext {
    pub fn new(request: ChatRequest) -> Self {
        let input = request.last_content().to_string();
        Self {
            request: Arc::new(request),
            input,
            model_response: None,
            tool_call: None,
            tool_result: None,
        }
    }

    /// Structured object returned by the model, if any.
    pub fn structured(&self) -> Option<&Value> {
        self.model_response.as_ref()?.structured.as_ref()
    }
}

/// A unit of work inside a workflow.
///
/// Steps stream non-terminal events through `events` and report failures as
/// errors; the orchestrator turns an error into the single terminal
/// `ErrorText`.
#[async_trait]
pub trait WorkflowStep: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, ctx: &mut StepContext, events: &EventSink) -> Result<StepOutcome>;
}
