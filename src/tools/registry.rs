//! Tool registry and dispatcher.

use super::ToolDefinition;
use crate::structured::ArgumentValidator;
use crate::types::{ToolCall, ToolSpec};
use crate::workflow::EventSink;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct RegisteredTool {
    definition: Arc<ToolDefinition>,
    validator: ArgumentValidator,
}

/// Name-keyed tool table. Built at startup, then shared read-only behind an
/// `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

/// A tool call that passed lookup and argument validation.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub call_id: String,
    pub definition: Arc<ToolDefinition>,
    pub arguments: Value,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<()> {
        let validator = ArgumentValidator::compile(&definition.parameters).map_err(|e| {
            Error::configuration_with_context(
                e,
                ErrorContext::new()
                    .with_field_path(format!("tools.{}.parameters", definition.name))
                    .with_source("tool_registry"),
            )
        })?;

        let name = definition.name.clone();
        let previous = self.tools.insert(
            name.clone(),
            RegisteredTool {
                definition: Arc::new(definition),
                validator,
            },
        );
        if previous.is_some() {
            tracing::warn!(tool = %name, "tool re-registered, previous definition replaced");
        } else {
            tracing::debug!(tool = %name, "tool registered");
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|t| t.definition.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All tool specs, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.names()
            .into_iter()
            .filter_map(|n| self.get(n))
            .map(ToolDefinition::to_spec)
            .collect()
    }

    /// Specs for the named subset; unregistered names are skipped.
    pub fn specs_for(&self, names: &[String]) -> Vec<ToolSpec> {
        names
            .iter()
            .filter_map(|n| self.get(n))
            .map(ToolDefinition::to_spec)
            .collect()
    }

    /// Look up the tool and validate its arguments. Nothing executes here.
    pub fn prepare(&self, call: &ToolCall) -> Result<PreparedCall> {
        let Some(tool) = self.tools.get(&call.name) else {
            return Err(Error::UnknownTool(call.name.clone()));
        };

        let arguments = call.parsed_arguments().map_err(|e| Error::Validation {
            tool: call.name.clone(),
            violations: vec![e],
        })?;

        tool.validator
            .validate(&arguments)
            .map_err(|violations| Error::Validation {
                tool: call.name.clone(),
                violations,
            })?;

        Ok(PreparedCall {
            call_id: call.id.clone(),
            definition: Arc::clone(&tool.definition),
            arguments,
        })
    }

    /// Run a prepared call under `timeout`.
    pub async fn execute(
        &self,
        prepared: PreparedCall,
        events: &EventSink,
        timeout: Duration,
    ) -> Result<Value> {
        let name = prepared.definition.name.clone();
        tracing::info!(tool = %name, call_id = %prepared.call_id, "executing tool");
        let operation = format!("tool '{}'", name);
        crate::utils::with_timeout(
            &operation,
            timeout,
            prepared.definition.handler.call(prepared.arguments, events),
        )
        .await
    }

    /// Prepare and execute in one go.
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        events: &EventSink,
        timeout: Duration,
    ) -> Result<Value> {
        let prepared = self.prepare(call)?;
        self.execute(prepared, events, timeout).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
