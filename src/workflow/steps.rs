//! Reusable steps: credential checks, status updates, model invocation.

use super::{EventSink, StepContext, StepOutcome, WorkflowStep};
use crate::client::{ModelClient, ModelMessage, ModelRequest};
use crate::structured::ResponseSchema;
use crate::types::ToolSpec;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Fails with a configuration error when a backend lacks credentials.
pub struct CredentialCheck {
    label: String,
    field: String,
    configured: Box<dyn Fn() -> bool + Send + Sync>,
}

impl CredentialCheck {
    pub fn new(
        label: impl Into<String>,
        field: impl Into<String>,
        configured: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            field: field.into(),
            configured: Box::new(configured),
        }
    }

    pub fn model(client: Arc<dyn ModelClient>) -> Self {
        Self::new("language model backend", "llm.api_key", move || {
            client.is_configured()
        })
    }
}

#[async_trait]
impl WorkflowStep for CredentialCheck {
    fn name(&self) -> &str {
        "credential_check"
    }

    async fn execute(&self, _ctx: &mut StepContext, _events: &EventSink) -> Result<StepOutcome> {
        if (self.configured)() {
            Ok(StepOutcome::Continue)
        } else {
            Err(Error::configuration_with_context(
                format!("{} is not configured", self.label),
                ErrorContext::new().with_field_path(self.field.clone()),
            ))
        }
    }
}

/// Emits one fixed `Status`.
pub struct StatusStep {
    phase: String,
    message: String,
}

impl StatusStep {
    pub fn new(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl WorkflowStep for StatusStep {
    fn name(&self) -> &str {
        "status"
    }

    async fn execute(&self, _ctx: &mut StepContext, events: &EventSink) -> Result<StepOutcome> {
        events.status(&self.phase, self.message.clone()).await?;
        Ok(StepOutcome::Continue)
    }
}

/// How the prompt is built from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptStyle {
    /// System prompt followed by the full conversation.
    Conversation { system: String },
    /// Single user message; `{input}` is replaced by the latest message.
    Template { template: String },
}

impl PromptStyle {
    pub fn messages(&self, ctx: &StepContext) -> Vec<ModelMessage> {
        match self {
            PromptStyle::Conversation { system } => std::iter::once(ModelMessage::system(system))
                .chain(ctx.request.messages.iter().map(ModelMessage::from))
                .collect(),
            PromptStyle::Template { template } => {
                vec![ModelMessage::user(template.replace("{input}", &ctx.input))]
            }
        }
    }
}

/// Calls the model and stores its response in the context.
///
/// Text and tool calls are surfaced by the orchestrator, not here.
pub struct ModelInvoke {
    client: Arc<dyn ModelClient>,
    model: String,
    prompt: PromptStyle,
    tools: Vec<ToolSpec>,
    response_schema: Option<ResponseSchema>,
    default_temperature: Option<f64>,
    timeout: Duration,
    status: Option<(String, String)>,
}

impl ModelInvoke {
    pub fn new(client: Arc<dyn ModelClient>, model: impl Into<String>, prompt: PromptStyle) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
            tools: Vec::new(),
            response_schema: None,
            default_temperature: None,
            timeout: Duration::from_secs(30),
            status: None,
        }
    }

    pub fn tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn response_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Used when the request carries no temperature.
    pub fn default_temperature(mut self, temperature: f64) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Status emitted right before the call.
    pub fn announce(mut self, phase: impl Into<String>, message: impl Into<String>) -> Self {
        self.status = Some((phase.into(), message.into()));
        self
    }

    fn build_request(&self, ctx: &StepContext) -> ModelRequest {
        let mut request = ModelRequest::new(&self.model, self.prompt.messages(ctx))
            .temperature(ctx.request.temperature.or(self.default_temperature))
            .timeout(self.timeout)
            .tools(self.tools.clone());
        if let Some(schema) = &self.response_schema {
            request = request.response_schema(schema.clone());
        }
        request
    }
}

#[async_trait]
impl WorkflowStep for ModelInvoke {
    fn name(&self) -> &str {
        "model_invoke"
    }

    async fn execute(&self, ctx: &mut StepContext, events: &EventSink) -> Result<StepOutcome> {
        if let Some((phase, message)) = &self.status {
            events.status(phase, message.clone()).await?;
        }

        let request = self.build_request(ctx);
        tracing::info!(model = %self.model, tools = self.tools.len(), "invoking model");
        let operation = format!("model '{}'", self.model);
        let response =
            crate::utils::with_timeout(&operation, self.timeout, self.client.complete(request))
                .await?;

        if let Some(text) = &response.content {
            tracing::debug!(text = %crate::utils::preview(text, 100), "model text");
        }
        ctx.model_response = Some(response);
        Ok(StepOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ModelResponse;
    use crate::types::{ChatRequest, Message, MessageRole};
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<ModelRequest>>,
    }

    #[async_trait]
    impl ModelClient for Recording {
        async fn complete(&self, request: ModelRequest) -> Result<ModelResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(ModelResponse::text("ok"))
        }
    }

    fn ctx(temperature: Option<f64>) -> StepContext {
        let mut req = ChatRequest::new(vec![Message::user("Nudeln, Tomaten")]);
        req.temperature = temperature;
        StepContext::new(req)
    }

    #[tokio::test]
    async fn test_template_prompt_and_default_temperature() {
        let client = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let step = ModelInvoke::new(
            client.clone(),
            "gpt-4.1",
            PromptStyle::Template {
                template: "Zutaten: {input}".into(),
            },
        )
        .default_temperature(0.3)
        .announce("developing", "👨‍🍳 Entwickle Rezept...");

        let (sink, mut rx) = EventSink::channel(4);
        let mut ctx = ctx(None);
        step.execute(&mut ctx, &sink).await.unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].messages.len(), 1);
        assert_eq!(seen[0].messages[0].text(), "Zutaten: Nudeln, Tomaten");
        assert_eq!(seen[0].temperature, Some(0.3));
        assert!(ctx.model_response.is_some());
        assert_eq!(
            rx.recv().await,
            Some(crate::types::WorkflowEvent::status("developing", "👨‍🍳 Entwickle Rezept..."))
        );
    }

    #[tokio::test]
    async fn test_conversation_prompt_and_request_temperature() {
        let client = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let step = ModelInvoke::new(
            client.clone(),
            "gpt-4o",
            PromptStyle::Conversation {
                system: "Du bist ein Bildberater".into(),
            },
        )
        .default_temperature(0.3);

        let (sink, _rx) = EventSink::channel(4);
        let mut ctx = ctx(Some(0.9));
        step.execute(&mut ctx, &sink).await.unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[0].role, MessageRole::System);
        assert_eq!(seen[0].temperature, Some(0.9));
    }

    #[tokio::test]
    async fn test_credential_check() {
        let (sink, _rx) = EventSink::channel(1);
        let mut c = ctx(None);
        let ok = CredentialCheck::new("x", "x.key", || true);
        assert_eq!(ok.execute(&mut c, &sink).await.unwrap(), StepOutcome::Continue);

        let missing = CredentialCheck::new("image backend", "image.api_key", || false);
        let err = missing.execute(&mut c, &sink).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
        assert!(err.to_string().contains("image backend is not configured"));
    }
}
