//! Service settings: optional YAML file, then environment overrides.
//!
//! Missing credentials are not a load error. Workflows check for them per
//! request and report a `configuration_error` in-band.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the optional YAML settings file.
pub const CONFIG_PATH_ENV: &str = "WORKFLOW_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub image: ImageSettings,
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// OpenAI-compatible chat completion backend (LiteLLM proxy or OpenAI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub recipe_model: String,
    pub image_chat_model: String,
    pub assistant_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// Timeouts in seconds, plus the per-request event buffer size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub model_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub rest_timeout_secs: u64,
    pub pipeline_timeout_secs: u64,
    pub event_buffer: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            recipe_model: "gpt-4.1".to_string(),
            image_chat_model: "gpt-4o".to_string(),
            assistant_model: "gpt-4o".to_string(),
        }
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.together.xyz/v1".to_string(),
            api_key: None,
            model: "black-forest-labs/FLUX.1-dev".to_string(),
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            model_timeout_secs: 30,
            tool_timeout_secs: 60,
            rest_timeout_secs: 30,
            pipeline_timeout_secs: 180,
            event_buffer: 64,
        }
    }
}

impl LimitSettings {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn rest_timeout(&self) -> Duration {
        Duration::from_secs(self.rest_timeout_secs)
    }

    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout_secs)
    }
}

impl Settings {
    /// Load from `$WORKFLOW_CONFIG` (if set), then apply process environment.
    pub fn load() -> Result<Self> {
        let mut settings = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read settings file: {}", e),
                ErrorContext::new().with_source(path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid settings YAML: {}", e),
                ErrorContext::new().with_source("settings"),
            )
        })
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production). Empty values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|k| get(k));

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_number("PORT", &v)?;
        }

        if let Some(v) = first(&["LITE_LLM_URL", "OPENAI_BASE_URL"]) {
            self.llm.base_url = v;
        }
        if let Some(v) = first(&["LITE_LLM_API_KEY", "OPENAI_API_KEY"]) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("RECIPE_MODEL") {
            self.llm.recipe_model = v;
        }
        if let Some(v) = get("IMAGE_CHAT_MODEL") {
            self.llm.image_chat_model = v;
        }
        if let Some(v) = get("ASSISTANT_MODEL") {
            self.llm.assistant_model = v;
        }

        if let Some(v) = get("TOGETHER_API_KEY") {
            self.image.api_key = Some(v);
        }
        if let Some(v) = get("TOGETHER_BASE_URL") {
            self.image.base_url = v;
        }
        if let Some(v) = get("IMAGE_MODEL") {
            self.image.model = v;
        }

        if let Some(v) = get("MODEL_TIMEOUT_SECS") {
            self.limits.model_timeout_secs = parse_number("MODEL_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("TOOL_TIMEOUT_SECS") {
            self.limits.tool_timeout_secs = parse_number("TOOL_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("REST_TIMEOUT_SECS") {
            self.limits.rest_timeout_secs = parse_number("REST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("PIPELINE_TIMEOUT_SECS") {
            self.limits.pipeline_timeout_secs = parse_number("PIPELINE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("EVENT_BUFFER") {
            self.limits.event_buffer = parse_number("EVENT_BUFFER", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_base_url("llm.base_url", &self.llm.base_url)?;
        validate_base_url("image.base_url", &self.image.base_url)?;

        if self.limits.event_buffer == 0 {
            return Err(Error::configuration_with_context(
                "event buffer must hold at least one event",
                ErrorContext::new().with_field_path("limits.event_buffer"),
            ));
        }
        let timeouts = [
            ("limits.model_timeout_secs", self.limits.model_timeout_secs),
            ("limits.tool_timeout_secs", self.limits.tool_timeout_secs),
            ("limits.rest_timeout_secs", self.limits.rest_timeout_secs),
            ("limits.pipeline_timeout_secs", self.limits.pipeline_timeout_secs),
        ];
        for (field, secs) in timeouts {
            if secs == 0 {
                return Err(Error::configuration_with_context(
                    "timeout must be greater than zero",
                    ErrorContext::new().with_field_path(field),
                ));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::configuration_with_context(
            format!("expected a number, got '{}'", value),
            ErrorContext::new().with_field_path(key),
        )
    })
}

fn validate_base_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid URL '{}'", value),
            ErrorContext::new()
                .with_field_path(field)
                .with_details(e.to_string()),
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::configuration_with_context(
            format!("unsupported URL scheme '{}'", parsed.scheme()),
            ErrorContext::new().with_field_path(field),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.bind_address(), "0.0.0.0:8000");
        assert_eq!(s.llm.recipe_model, "gpt-4.1");
        assert_eq!(s.image.model, "black-forest-labs/FLUX.1-dev");
        assert_eq!(s.limits.pipeline_timeout(), Duration::from_secs(180));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_and_precedence() {
        let mut s = Settings::default();
        s.apply_overrides(env(&[
            ("PORT", "9001"),
            ("LITE_LLM_URL", "http://litellm:4000"),
            ("OPENAI_BASE_URL", "http://ignored"),
            ("OPENAI_API_KEY", "sk-test"),
            ("TOGETHER_API_KEY", ""),
            ("EVENT_BUFFER", "8"),
        ]))
        .unwrap();

        assert_eq!(s.server.port, 9001);
        assert_eq!(s.llm.base_url, "http://litellm:4000");
        assert_eq!(s.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(s.image.api_key, None);
        assert_eq!(s.limits.event_buffer, 8);
    }

    #[test]
    fn test_bad_number_names_the_variable() {
        let mut s = Settings::default();
        let err = s.apply_overrides(env(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("PORT")
        );
    }

    #[test]
    fn test_yaml_partial_sections() {
        let s = Settings::from_yaml_str(
            "llm:\n  recipe_model: gpt-4o-mini\nlimits:\n  model_timeout_secs: 5\n",
        )
        .unwrap();
        assert_eq!(s.llm.recipe_model, "gpt-4o-mini");
        assert_eq!(s.llm.image_chat_model, "gpt-4o");
        assert_eq!(s.limits.model_timeout(), Duration::from_secs(5));
        assert_eq!(s.limits.tool_timeout_secs, 60);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut s = Settings::default();
        s.llm.base_url = "not a url".into();
        let err = s.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);

        s.llm.base_url = "ftp://example.com".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut s = Settings::default();
        s.limits.tool_timeout_secs = 0;
        assert!(s.validate().is_err());
    }
}
