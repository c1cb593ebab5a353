//! Image workflow: the chat model decides whether to call `create_image`,
//! generated images are streamed, then analyzed by the same model.

use super::orchestrator::WorkflowPlan;
use super::steps::{CredentialCheck, ModelInvoke, PromptStyle};
use super::{EventSink, StepContext, StepOutcome, WorkflowStep};
use crate::client::{ContentPart, ModelClient, ModelMessage, ModelRequest};
use crate::config::Settings;
use crate::tools::image::{images_from_result, TOOL_NAME};
use crate::tools::ToolRegistry;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const WORKFLOW_NAME: &str = "image";

pub const COMPLETION_MESSAGE: &str = "🎨 Fertig!";
pub const FAILURE_PREFIX: &str = "❌ **Fehler bei der Bildgenerierung:**";
pub const EMPTY_INPUT_MESSAGE: &str =
    "❌ **Fehler:** Bitte beschreiben Sie das Bild, das erstellt werden soll.";

pub const SYSTEM_PROMPT: &str = "You are an expert image creator and advisor. You can help create images through \
text-to-image generation and provide detailed advice on optimizing image prompts. \
You'll analyze the request and either create an image directly or help improve \
the image generation prompt. You aim to understand the visual elements the user wants \
and translate them into effective prompts that capture their vision.";

const ANALYSIS_PROMPT: &str = "Please analyze the generated image and provide feedback on how well it \
matches the requested prompt. What aspects were captured successfully and \
what could be improved? It is very important to answer in German.";

/// Asks the model to review the generated images.
///
/// A failed analysis does not fail the request; its error is reported as
/// text instead.
pub struct ImageAnalysis {
    client: Arc<dyn ModelClient>,
    model: String,
    timeout: Duration,
}

impl ImageAnalysis {
    pub fn new(client: Arc<dyn ModelClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            model: model.into(),
            timeout,
        }
    }

    fn build_request(&self, ctx: &StepContext, images: &[String]) -> ModelRequest {
        let mut parts = vec![ContentPart::text(ANALYSIS_PROMPT)];
        parts.extend(
            images
                .iter()
                .map(|b64| ContentPart::image_url(format!("data:image/jpeg;base64,{}", b64))),
        );

        let messages = std::iter::once(ModelMessage::system(SYSTEM_PROMPT))
            .chain(ctx.request.messages.iter().map(ModelMessage::from))
            .chain(std::iter::once(ModelMessage::user_parts(parts)))
            .collect();

        ModelRequest::new(&self.model, messages)
            .temperature(ctx.request.temperature)
            .timeout(self.timeout)
    }

    async fn analyze(&self, request: ModelRequest) -> Result<String> {
        let operation = format!("model '{}'", self.model);
        let response =
            crate::utils::with_timeout(&operation, self.timeout, self.client.complete(request))
                .await?;
        Ok(response.content.unwrap_or_default())
    }
}

#[async_trait]
impl WorkflowStep for ImageAnalysis {
    fn name(&self) -> &str {
        "image_analysis"
    }

    async fn execute(&self, ctx: &mut StepContext, events: &EventSink) -> Result<StepOutcome> {
        let images = ctx
            .tool_result
            .as_ref()
            .map(images_from_result)
            .unwrap_or_default();
        if images.is_empty() {
            tracing::debug!("no images to analyze");
            return Ok(StepOutcome::Continue);
        }

        tracing::info!(images = images.len(), "analyzing generated images");
        let text = match self.analyze(self.build_request(ctx, &images)).await {
            Ok(text) => {
                tracing::debug!(analysis = %crate::utils::preview(&text, 100), "image analysis done");
                text
            }
            Err(e) => {
                tracing::warn!(error = %e, "image analysis failed");
                format!("Bildanalyse konnte nicht durchgeführt werden: {}", e)
            }
        };
        if !text.is_empty() {
            events.text(text).await?;
        }
        Ok(StepOutcome::Continue)
    }
}

pub fn image_workflow(
    client: Arc<dyn ModelClient>,
    registry: &ToolRegistry,
    settings: &Settings,
) -> WorkflowPlan {
    let tools = vec![TOOL_NAME.to_string()];
    let model = ModelInvoke::new(
        Arc::clone(&client),
        &settings.llm.image_chat_model,
        PromptStyle::Conversation {
            system: SYSTEM_PROMPT.to_string(),
        },
    )
    .tools(registry.specs_for(&tools))
    .timeout(settings.limits.model_timeout());

    WorkflowPlan::new(WORKFLOW_NAME, Arc::new(model))
        .empty_input_message(EMPTY_INPUT_MESSAGE)
        .failure_prefix(FAILURE_PREFIX)
        .completion_message(COMPLETION_MESSAGE)
        .preflight(Arc::new(CredentialCheck::model(Arc::clone(&client))))
        .tools(tools)
        .after_tool(Arc::new(ImageAnalysis::new(
            client,
            &settings.llm.image_chat_model,
            settings.limits.model_timeout(),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ModelContent, ModelResponse};
    use crate::types::{ChatRequest, Message};
    use crate::Error;

    struct Unreachable;

    #[async_trait]
    impl ModelClient for Unreachable {
        async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse> {
            Err(Error::Remote {
                status: 503,
                message: "overloaded".into(),
            })
        }
    }

    fn ctx_with_images() -> StepContext {
        let mut ctx = StepContext::new(ChatRequest::new(vec![Message::user("a red fox")]));
        ctx.tool_result = Some(serde_json::json!({"images": ["AAA", "BBB"]}));
        ctx
    }

    #[test]
    fn test_analysis_request_attaches_images() {
        let step = ImageAnalysis::new(Arc::new(Unreachable), "gpt-4o", Duration::from_secs(1));
        let ctx = ctx_with_images();
        let req = step.build_request(&ctx, &["AAA".to_string(), "BBB".to_string()]);

        assert_eq!(req.messages.len(), 3);
        let ModelContent::Parts(parts) = &req.messages[2].content else {
            panic!("expected multimodal content");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], ContentPart::image_url("data:image/jpeg;base64,AAA"));
    }

    #[tokio::test]
    async fn test_failed_analysis_degrades_to_text() {
        let step = ImageAnalysis::new(Arc::new(Unreachable), "gpt-4o", Duration::from_secs(1));
        let (sink, mut rx) = EventSink::channel(4);
        let mut ctx = ctx_with_images();

        let outcome = step.execute(&mut ctx, &sink).await.unwrap();
        assert_eq!(outcome, StepOutcome::Continue);
        match rx.recv().await {
            Some(crate::types::WorkflowEvent::TextChunk { text }) => {
                assert!(text.starts_with("Bildanalyse konnte nicht durchgeführt werden: "));
                assert!(text.contains("503"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nothing_to_analyze() {
        let step = ImageAnalysis::new(Arc::new(Unreachable), "gpt-4o", Duration::from_secs(1));
        let (sink, mut rx) = EventSink::channel(4);
        let mut ctx = StepContext::new(ChatRequest::new(vec![Message::user("x")]));
        step.execute(&mut ctx, &sink).await.unwrap();
        drop(sink);
        assert_eq!(rx.recv().await, None);
    }
}
