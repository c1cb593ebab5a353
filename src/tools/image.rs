//! `create_image`: text-to-image generation.

use super::{ToolDefinition, ToolHandler, ToolProgress};
use crate::structured::ObjectSchema;
use crate::transport::{build_client, http, HttpClientOptions};
use crate::types::GeneratedImage;
use crate::workflow::EventSink;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const TOOL_NAME: &str = "create_image";

/// Validated `create_image` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArgs {
    pub prompt: String,
    #[serde(deserialize_with = "whole_number")]
    pub width: u32,
    #[serde(deserialize_with = "whole_number")]
    pub height: u32,
    #[serde(deserialize_with = "whole_number")]
    pub num_images: u32,
}

/// JSON Schema `integer` admits `512.0`; accept it as `512`.
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = number.as_u64() {
        return u32::try_from(n).map_err(D::Error::custom);
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&f) => Ok(f as u32),
        _ => Err(D::Error::custom(format!(
            "expected a non-negative whole number, got {}",
            number
        ))),
    }
}

impl ImageArgs {
    /// Decode schema-checked arguments. Failures are argument errors, not
    /// backend errors.
    pub fn from_arguments(arguments: Value) -> Result<Self> {
        serde_json::from_value(arguments).map_err(|e| Error::Validation {
            tool: TOOL_NAME.to_string(),
            violations: vec![e.to_string()],
        })
    }

    pub fn parameters_schema() -> Value {
        let dimension = |axis: &str| {
            json!({
                "type": "integer",
                "minimum": 256,
                "maximum": 1024,
                "description": format!(
                    "The {} of the image to generate. Must be between 256 and 1024. Default is 512.",
                    axis
                ),
            })
        };
        ObjectSchema::new()
            .required(
                "prompt",
                json!({
                    "type": "string",
                    "description": "A highly optimized prompt for image generation. In English.",
                }),
            )
            .required("width", dimension("width"))
            .required("height", dimension("height"))
            .required(
                "num_images",
                json!({
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 10,
                    "description": "The number of images to generate. Must be between 1 and 10. Default is 1.",
                }),
            )
            .build()
    }
}

/// Text-to-image provider. Returns one base64-encoded PNG per image.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, args: &ImageArgs) -> Result<Vec<String>>;
}

/// Together-style `/images/generations` backend.
#[derive(Debug, Clone)]
pub struct TogetherImageBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl TogetherImageBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(&HttpClientOptions::with_timeout(timeout))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            timeout,
        })
    }
}

#[async_trait]
impl ImageBackend for TogetherImageBackend {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, args: &ImageArgs) -> Result<Vec<String>> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::configuration_with_context(
                "TOGETHER_API_KEY environment variable is required",
                ErrorContext::new().with_field_path("image.api_key"),
            ));
        };

        tracing::info!(
            model = %self.model,
            count = args.num_images,
            width = args.width,
            height = args.height,
            "generating images"
        );
        tracing::debug!(prompt = %crate::utils::preview(&args.prompt, 100), "image prompt");

        let body = json!({
            "model": self.model,
            "prompt": args.prompt,
            "n": args.num_images,
            "width": args.width,
            "height": args.height,
            "response_format": "b64_json",
        });
        let req = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(api_key)
            .json(&body);

        let resp = http::send(req, "image generation", self.timeout).await?;
        let json = http::read_json(resp, "image generation", self.timeout).await?;

        let images: Vec<String> = json
            .get("data")
            .and_then(|d| d.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.get("b64_json").and_then(|b| b.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if images.is_empty() {
            return Err(Error::backend_with_context(
                "image backend returned no images",
                ErrorContext::new().with_source("together"),
            ));
        }
        tracing::info!(count = images.len(), "images generated");
        Ok(images)
    }
}

/// Handler streaming each generated image as a payload event.
///
/// Result: `{"prompt", "width", "height", "images": [<base64>...]}`.
pub struct ImageTool {
    backend: Arc<dyn ImageBackend>,
}

impl ImageTool {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }

    pub fn definition(backend: Arc<dyn ImageBackend>) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_NAME,
            "Create an image based on a prompt.",
            ImageArgs::parameters_schema(),
            Arc::new(Self::new(backend)),
        )
        .with_progress(
            ToolProgress::default()
                .running("generating", "🖼️ Erstelle Bilder...")
                .finished("analyzing", "💬 Analyse des Bildes..."),
        )
        .strict()
    }
}

#[async_trait]
impl ToolHandler for ImageTool {
    async fn call(&self, arguments: Value, events: &EventSink) -> Result<Value> {
        let args = ImageArgs::from_arguments(arguments)?;
        let images = self.backend.generate(&args).await?;

        for (i, b64) in images.iter().enumerate() {
            tracing::debug!(index = i + 1, total = images.len(), "streaming image");
            let image = GeneratedImage::from_base64_png(b64, &args.prompt, args.width, args.height);
            events.emit(image.into_event()).await?;
        }

        Ok(json!({
            "prompt": args.prompt,
            "width": args.width,
            "height": args.height,
            "images": images,
        }))
    }
}

/// Base64 images from an [`ImageTool`] result.
pub fn images_from_result(result: &Value) -> Vec<String> {
    result
        .get("images")
        .and_then(|i| i.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
