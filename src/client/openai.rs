//! OpenAI-compatible `/chat/completions` backend (OpenAI, LiteLLM, vLLM, ...).

use super::types::{ModelRequest, ModelResponse, TokenUsage};
use super::ModelClient;
use crate::transport::{build_client, http, HttpClientOptions};
use crate::types::ToolCall;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        // Per-call timeouts are set on each request; this is only a ceiling.
        let client = build_client(&HttpClientOptions::with_timeout(Duration::from_secs(600)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body(request: &ModelRequest) -> Result<Value> {
        let mut body = Map::new();
        body.insert("model".into(), json!(request.model));
        body.insert("messages".into(), serde_json::to_value(&request.messages)?);
        if let Some(t) = request.temperature {
            body.insert("temperature".into(), json!(t));
        }
        if !request.tools.is_empty() {
            body.insert("tools".into(), serde_json::to_value(&request.tools)?);
            body.insert("tool_choice".into(), json!("auto"));
        }
        if let Some(schema) = &request.response_schema {
            body.insert("response_format".into(), schema.to_openai_format());
        }
        Ok(Value::Object(body))
    }

    fn parse_response(request: &ModelRequest, body: Value) -> Result<ModelResponse> {
        let message = body
            .pointer("/choices/0/message")
            .ok_or_else(|| {
                Error::backend_with_context(
                    "response contains no choices",
                    ErrorContext::new().with_source("openai_client"),
                )
            })?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .map(str::to_string);

        let tool_calls = message
            .get("tool_calls")
            .and_then(|t| t.as_array())
            .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
            .unwrap_or_default();

        let usage = body
            .get("usage")
            .cloned()
            .and_then(|u| serde_json::from_value::<TokenUsage>(u).ok());

        let mut response = ModelResponse {
            content,
            tool_calls,
            structured: None,
            usage,
        };

        if let Some(schema) = &request.response_schema {
            let raw = response.content.take().unwrap_or_default();
            let value: Value = serde_json::from_str(raw.trim()).map_err(|e| {
                Error::backend_with_context(
                    format!("model did not return valid JSON for '{}'", schema.name),
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("openai_client"),
                )
            })?;
            response.structured = Some(value);
        }

        Ok(response)
    }
}

fn parse_tool_call(raw: &Value) -> Option<ToolCall> {
    let function = raw.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    Some(ToolCall {
        id: raw
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or_default()
            .to_string(),
        name,
        arguments: function.get("arguments").cloned().unwrap_or(Value::Null),
    })
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::configuration_with_context(
                "no API key configured for the language model backend",
                ErrorContext::new().with_field_path("llm.api_key"),
            ));
        };

        let body = Self::build_body(&request)?;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            structured = request.response_schema.is_some(),
            "calling chat completions"
        );

        let req = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .timeout(request.timeout)
            .json(&body);

        let operation = format!("model '{}'", request.model);
        let resp = http::send(req, &operation, request.timeout).await?;
        let json = http::read_json(resp, &operation, request.timeout).await?;
        let response = Self::parse_response(&request, json)?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion finished"
            );
        }
        Ok(response)
    }
}
