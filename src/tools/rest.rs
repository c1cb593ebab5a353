//! Tools backed by public JSON APIs (cat facts, dog pictures, advice, quotes).

use super::{ToolDefinition, ToolHandler, ToolRegistry};
use crate::structured::ObjectSchema;
use crate::transport::RestClient;
use crate::workflow::EventSink;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Endpoints used by the REST tools. Overridable for tests and mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalApis {
    pub cat_fact_url: String,
    pub dog_image_url: String,
    pub advice_url: String,
    pub quote_url: String,
}

impl Default for ExternalApis {
    fn default() -> Self {
        Self {
            cat_fact_url: "https://catfact.ninja/fact".to_string(),
            dog_image_url: "https://dog.ceo/api/breeds/image/random".to_string(),
            advice_url: "https://api.adviceslip.com/advice".to_string(),
            quote_url: "https://api.quotable.io/random".to_string(),
        }
    }
}

impl ExternalApis {
    /// All endpoints under one base URL (`{base}/fact`, `{base}/breeds/image/random`,
    /// `{base}/advice`, `{base}/random`).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            cat_fact_url: format!("{}/fact", base),
            dog_image_url: format!("{}/breeds/image/random", base),
            advice_url: format!("{}/advice", base),
            quote_url: format!("{}/random", base),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestToolKind {
    CatFact,
    DogImage,
    Advice,
    DailyInspiration,
}

impl RestToolKind {
    pub const ALL: [RestToolKind; 4] = [
        RestToolKind::CatFact,
        RestToolKind::DogImage,
        RestToolKind::Advice,
        RestToolKind::DailyInspiration,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RestToolKind::CatFact => "cat_fact",
            RestToolKind::DogImage => "dog_image",
            RestToolKind::Advice => "advice",
            RestToolKind::DailyInspiration => "daily_inspiration",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RestToolKind::CatFact => "Holt einen interessanten Fakt über Katzen",
            RestToolKind::DogImage => "Holt ein zufälliges Hundebild",
            RestToolKind::Advice => "Holt einen zufälligen Lebensratschlag",
            RestToolKind::DailyInspiration => {
                "Erstellt eine tägliche Inspirationsnachricht mit Zitat und Fakten"
            }
        }
    }

    pub fn parameters(&self) -> Value {
        match self {
            RestToolKind::DailyInspiration => ObjectSchema::new()
                .optional(
                    "include_animals",
                    json!({
                        "type": "boolean",
                        "description": "Ob ein Tierfakt angehängt werden soll (Standard: true)",
                    }),
                )
                .build(),
            _ => ObjectSchema::new().build(),
        }
    }
}

pub struct RestTool {
    kind: RestToolKind,
    client: RestClient,
    apis: Arc<ExternalApis>,
}

impl RestTool {
    pub fn new(kind: RestToolKind, client: RestClient, apis: Arc<ExternalApis>) -> Self {
        Self { kind, client, apis }
    }

    pub fn definition(self) -> ToolDefinition {
        let kind = self.kind;
        ToolDefinition::new(kind.name(), kind.description(), kind.parameters(), Arc::new(self))
    }

    /// Fetch and format the tool's Markdown answer.
    pub async fn run(&self, arguments: &Value) -> Result<String> {
        match self.kind {
            RestToolKind::CatFact => {
                let body = self.client.get_json(&self.apis.cat_fact_url).await?;
                Ok(format!(
                    "🐱 **Katzenfakt:** {}",
                    field_str(&body, "/fact", &self.apis.cat_fact_url)?
                ))
            }
            RestToolKind::DogImage => {
                let body = self.client.get_json(&self.apis.dog_image_url).await?;
                let url = &self.apis.dog_image_url;
                Ok(format!(
                    "🐕 **Hundebild:** {}\n\n📊 **Status:** {}",
                    field_str(&body, "/message", url)?,
                    field_str(&body, "/status", url)?
                ))
            }
            RestToolKind::Advice => {
                let body = self.client.get_json(&self.apis.advice_url).await?;
                let url = &self.apis.advice_url;
                Ok(format!(
                    "💡 **Ratschlag #{}:** {}",
                    field_str(&body, "/slip/id", url)?,
                    field_str(&body, "/slip/advice", url)?
                ))
            }
            RestToolKind::DailyInspiration => {
                let include_animals = arguments
                    .get("include_animals")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(true);
                self.daily_inspiration(include_animals).await
            }
        }
    }

    async fn daily_inspiration(&self, include_animals: bool) -> Result<String> {
        let quote = self.client.get_json(&self.apis.quote_url).await?;
        let advice = self.client.get_json(&self.apis.advice_url).await?;

        let mut content = String::from("🌟 **Tägliche Inspiration** 🌟\n\n");
        content.push_str(&format!(
            "📝 **Zitat des Tages:**\n\"{}\" - {}\n\n",
            field_str(&quote, "/content", &self.apis.quote_url)?,
            field_str(&quote, "/author", &self.apis.quote_url)?
        ));
        content.push_str(&format!(
            "💡 **Ratschlag:**\n{}\n\n",
            field_str(&advice, "/slip/advice", &self.apis.advice_url)?
        ));
        if include_animals {
            let fact = self.client.get_json(&self.apis.cat_fact_url).await?;
            content.push_str(&format!(
                "🐱 **Interessanter Fakt:**\n{}\n\n",
                field_str(&fact, "/fact", &self.apis.cat_fact_url)?
            ));
        }
        content.push_str("✨ _Wünsche dir einen wunderbaren Tag!_ ✨");
        Ok(content)
    }
}

#[async_trait]
impl ToolHandler for RestTool {
    async fn call(&self, arguments: Value, events: &EventSink) -> Result<Value> {
        let text = self.run(&arguments).await?;
        tracing::info!(tool = self.kind.name(), response = %crate::utils::preview(&text, 100), "rest tool answered");
        events.text(text.clone()).await?;
        Ok(Value::String(text))
    }
}

/// Register all REST tools sharing one client.
pub fn register_rest_tools(
    registry: &mut ToolRegistry,
    client: RestClient,
    apis: ExternalApis,
) -> Result<Vec<String>> {
    let apis = Arc::new(apis);
    RestToolKind::ALL
        .iter()
        .map(|kind| {
            registry.register(RestTool::new(*kind, client.clone(), Arc::clone(&apis)).definition())?;
            Ok(kind.name().to_string())
        })
        .collect()
}

/// String (or scalar rendered as string) at `pointer`, else a backend error.
fn field_str(body: &Value, pointer: &str, url: &str) -> Result<String> {
    match body.pointer(pointer) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v) if !v.is_null() => Ok(v.to_string()),
        _ => Err(Error::backend_with_context(
            format!("unexpected response, missing '{}'", pointer.trim_start_matches('/')),
            ErrorContext::new().with_source(url.to_string()),
        )),
    }
}
