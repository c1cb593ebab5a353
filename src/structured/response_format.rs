//! Schema-constrained model output.

use serde_json::{json, Value};

/// Requests that the model answer with a JSON object matching `schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    /// Name for the schema (used in OpenAI format)
    pub name: String,
    pub schema: Value,
    /// Whether to enforce strict schema compliance
    pub strict: bool,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }

    /// Build a strict schema from a Rust type.
    pub fn for_type<T: schemars::JsonSchema>(name: impl Into<String>) -> Self {
        Self::new(name, crate::structured::schema_for_type::<T>())
    }

    /// `response_format` value for OpenAI-compatible chat completions.
    pub fn to_openai_format(&self) -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": self.name,
                "schema": self.schema,
                "strict": self.strict,
            }
        })
    }
}
