//! Workflow orchestration.
//!
//! A workflow is a [`WorkflowPlan`] (steps plus the tools its model may call)
//! driven by an [`Orchestrator`]. Each request gets its own task and a
//! bounded [`EventSink`]; the orchestrator emits exactly one terminal event.
//!
//! | Workflow | Route | Model output |
//! |----------|-------|--------------|
//! | `recipe` | `POST /recipe/chat/completions` | structured [`recipe::Recipe`] |
//! | `image` | `POST /image/chat/completions` | text and/or `create_image` call |
//! | `assistant` | `POST /assistant/chat/completions` | text and/or a REST tool call |

pub mod assistant;
pub mod image;
pub mod orchestrator;
pub mod recipe;
pub mod sink;
pub mod step;
pub mod steps;

pub use orchestrator::{Orchestrator, OrchestratorLimits, WorkflowPlan, WorkflowState};
pub use sink::EventSink;
pub use step::{StepContext, StepOutcome, WorkflowStep};

use crate::client::{ModelClient, OpenAiClient};
use crate::config::{LimitSettings, Settings};
use crate::tools::{
    register_rest_tools, ExternalApis, ImageBackend, ImageTool, TogetherImageBackend, ToolRegistry,
};
use crate::transport::RestClient;
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

impl From<&LimitSettings> for OrchestratorLimits {
    fn from(limits: &LimitSettings) -> Self {
        Self {
            event_buffer: limits.event_buffer,
            tool_timeout: limits.tool_timeout(),
            pipeline_timeout: limits.pipeline_timeout(),
        }
    }
}

/// Backends injected into the workflows.
#[derive(Clone)]
pub struct Backends {
    pub model: Arc<dyn ModelClient>,
    pub images: Arc<dyn ImageBackend>,
    pub rest: RestClient,
    pub apis: ExternalApis,
}

impl Backends {
    /// Production backends: OpenAI-compatible chat, Together images, public REST APIs.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let model = OpenAiClient::new(&settings.llm.base_url, settings.llm.api_key.clone())?;
        let images = TogetherImageBackend::new(
            &settings.image.base_url,
            settings.image.api_key.clone(),
            &settings.image.model,
            settings.limits.tool_timeout(),
        )?;
        if !model.is_configured() {
            tracing::warn!("no language model API key configured; requests will fail until one is set");
        }
        if !images.is_configured() {
            tracing::warn!("TOGETHER_API_KEY not set; image generation will fail");
        }
        Ok(Self {
            model: Arc::new(model),
            images: Arc::new(images),
            rest: RestClient::new(settings.limits.rest_timeout())?,
            apis: ExternalApis::default(),
        })
    }
}

/// All workflows plus the tool registry they share.
#[derive(Debug, Clone)]
pub struct Workflows {
    pub registry: Arc<ToolRegistry>,
    pub orchestrators: BTreeMap<String, Orchestrator>,
}

impl Workflows {
    pub fn build(settings: &Settings, backends: Backends) -> Result<Self> {
        let mut registry = ToolRegistry::new();
        registry.register(ImageTool::definition(Arc::clone(&backends.images)))?;
        let rest_tools = register_rest_tools(&mut registry, backends.rest, backends.apis)?;

        let plans = vec![
            recipe::recipe_workflow(Arc::clone(&backends.model), settings),
            image::image_workflow(Arc::clone(&backends.model), &registry, settings),
            assistant::assistant_workflow(
                Arc::clone(&backends.model),
                &registry,
                rest_tools,
                settings,
            ),
        ];

        let registry = Arc::new(registry);
        let limits = OrchestratorLimits::from(&settings.limits);
        let orchestrators = plans
            .into_iter()
            .map(|plan| {
                (
                    plan.name.clone(),
                    Orchestrator::new(plan, Arc::clone(&registry), limits),
                )
            })
            .collect();

        tracing::info!(tools = ?registry.names(), "workflows ready");
        Ok(Self {
            registry,
            orchestrators,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Orchestrator> {
        self.orchestrators.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.orchestrators.keys().map(String::as_str).collect()
    }
}
