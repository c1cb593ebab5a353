//! Schema generation utilities.

use serde_json::{json, Map, Value};

/// Builder for flat object schemas (tool parameters).
///
/// Additional properties are rejected unless explicitly allowed.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    properties: Vec<(String, Value)>,
    required: Vec<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property that must be present.
    pub fn required(mut self, name: impl Into<String>, schema: Value) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.push((name, schema));
        self
    }

    /// Add a property that may be omitted.
    pub fn optional(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.properties.push((name.into(), schema));
        self
    }

    pub fn build(self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), json!("object"));

        let properties: Map<String, Value> = self.properties.into_iter().collect();
        map.insert("properties".into(), properties.into());

        if !self.required.is_empty() {
            map.insert("required".into(), self.required.into());
        }
        map.insert("additionalProperties".into(), json!(false));

        map.into()
    }
}

/// JSON schema for a Rust type, without the `$schema`/`title` envelope that
/// providers reject in tool and response-format definitions.
pub fn schema_for_type<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[test]
    fn test_object_schema_required_and_optional() {
        let schema = ObjectSchema::new()
            .required("prompt", json!({"type": "string"}))
            .optional("include_animals", json!({"type": "boolean"}))
            .build();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["prompt"]));
        assert_eq!(schema["properties"]["include_animals"]["type"], "boolean");
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn test_empty_object_schema_has_no_required_list() {
        let schema = ObjectSchema::new().build();
        assert!(schema.get("required").is_none());
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_schema_for_type_strips_envelope() {
        let schema = schema_for_type::<Sample>();
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], json!(false));
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("name")));
        assert!(required.contains(&json!("tags")));
    }
}
