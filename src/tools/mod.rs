//! Tool definitions, the registry/dispatcher, and the built-in tools.
//!
//! | Tool | Module | Backend |
//! |------|--------|---------|
//! | `create_image` | [`image`] | [`ImageBackend`] (Together-style API) |
//! | `cat_fact`, `dog_image`, `advice`, `daily_inspiration` | [`rest`] | public JSON APIs |

pub mod image;
pub mod registry;
pub mod rest;

pub use image::{ImageArgs, ImageBackend, ImageTool, TogetherImageBackend};
pub use registry::{PreparedCall, ToolRegistry};
pub use rest::{register_rest_tools, ExternalApis, RestTool, RestToolKind};

use crate::types::ToolSpec;
use crate::workflow::EventSink;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Executes one tool with already-validated arguments.
///
/// Handlers may stream intermediate events (e.g. generated images) through
/// `events`. The returned value is kept for follow-up steps.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value, events: &EventSink) -> Result<Value>;
}

/// A `Status` emitted around tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabel {
    pub phase: String,
    pub text: String,
}

impl StatusLabel {
    pub fn new(phase: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            text: text.into(),
        }
    }
}

/// Progress labels shown before and after the handler runs. Unset labels
/// fall back to generic ones naming the tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolProgress {
    pub running: Option<StatusLabel>,
    pub finished: Option<StatusLabel>,
}

impl ToolProgress {
    pub fn running(mut self, phase: &str, text: impl Into<String>) -> Self {
        self.running = Some(StatusLabel::new(phase, text));
        self
    }

    pub fn finished(mut self, phase: &str, text: impl Into<String>) -> Self {
        self.finished = Some(StatusLabel::new(phase, text));
        self
    }
}

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema (Draft 7) for the arguments object.
    pub parameters: Value,
    pub handler: Arc<dyn ToolHandler>,
    pub progress: ToolProgress,
    /// Ask the provider for strict schema adherence.
    pub strict: bool,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
            progress: ToolProgress::default(),
            strict: false,
        }
    }

    pub fn with_progress(mut self, progress: ToolProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// `Status` emitted right before the handler runs.
    pub fn running_label(&self) -> StatusLabel {
        self.progress
            .running
            .clone()
            .unwrap_or_else(|| StatusLabel::new("calling", format!("🔧 Rufe {} auf...", self.name)))
    }

    /// `Status` emitted once the handler returned successfully.
    pub fn finished_label(&self) -> StatusLabel {
        self.progress
            .finished
            .clone()
            .unwrap_or_else(|| StatusLabel::new("finished", format!("✅ {} abgeschlossen", self.name)))
    }

    /// Description in OpenAI tool format.
    pub fn to_spec(&self) -> ToolSpec {
        let mut spec = ToolSpec::function(&self.name, &self.description, self.parameters.clone());
        if self.strict {
            spec.function.strict = Some(true);
        }
        spec
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("progress", &self.progress)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}
