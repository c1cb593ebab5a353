//! Assistant workflow: a chat model with the public REST tools.

use super::orchestrator::WorkflowPlan;
use super::steps::{CredentialCheck, ModelInvoke, PromptStyle};
use crate::client::ModelClient;
use crate::config::Settings;
use crate::tools::ToolRegistry;
use std::sync::Arc;

pub const WORKFLOW_NAME: &str = "assistant";

pub const SYSTEM_PROMPT: &str = "Du bist ein freundlicher Assistent. Du kannst Katzenfakten, \
zufällige Hundebilder, Lebensratschläge und eine tägliche Inspiration abrufen. \
Nutze dafür die verfügbaren Werkzeuge und antworte auf Deutsch.";

pub fn assistant_workflow(
    client: Arc<dyn ModelClient>,
    registry: &ToolRegistry,
    tools: Vec<String>,
    settings: &Settings,
) -> WorkflowPlan {
    let model = ModelInvoke::new(
        Arc::clone(&client),
        &settings.llm.assistant_model,
        PromptStyle::Conversation {
            system: SYSTEM_PROMPT.to_string(),
        },
    )
    .tools(registry.specs_for(&tools))
    .timeout(settings.limits.model_timeout());

    WorkflowPlan::new(WORKFLOW_NAME, Arc::new(model))
        .empty_input_message("❌ **Fehler:** Bitte geben Sie eine Nachricht ein.")
        .failure_prefix("❌ **Fehler:**")
        .completion_message("✅ Fertig!")
        .preflight(Arc::new(CredentialCheck::model(client)))
        .tools(tools)
}
