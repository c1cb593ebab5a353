//! Tool argument validation using JSON Schema.

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

/// Compiled parameter contract of one tool.
pub struct ArgumentValidator {
    schema: JSONSchema,
}

impl ArgumentValidator {
    /// Compile a parameter schema (Draft 7).
    pub fn compile(schema: &Value) -> Result<Self, String> {
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| format!("Failed to compile schema: {}", e))?;
        Ok(Self { schema })
    }

    /// Check `arguments` against the contract, collecting every violation as
    /// `"<path>: <message>"` (path omitted at the root).
    pub fn validate(&self, arguments: &Value) -> Result<(), Vec<String>> {
        match self.schema.validate(arguments) {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect()),
        }
    }
}

impl std::fmt::Debug for ArgumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentValidator").finish_non_exhaustive()
    }
}
