use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "llm.base_url", "arguments.width")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "settings", "openai_client")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Machine-readable error category carried alongside in-band error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Empty or unusable user content.
    InputError,
    /// Missing credential or configuration for a backend.
    ConfigurationError,
    /// Model or tool backend failure, including timeouts.
    BackendError,
    /// Tool arguments violate the tool's parameter contract.
    ValidationError,
    /// The model declared a tool that is not registered.
    UnknownToolError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputError => "input_error",
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::BackendError => "backend_error",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::UnknownToolError => "unknown_tool_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for workflows, tools and backends.
#[derive(Debug, Error)]
pub enum Error {
    /// The message is shown to the caller verbatim.
    #[error("{message}")]
    Input { message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Backend error: {message}{}", format_context(.context))]
    Backend {
        message: String,
        context: ErrorContext,
    },

    #[error("Remote error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Timed out after {}s waiting for {operation}", .after.as_secs_f64())]
    Timeout { operation: String, after: Duration },

    #[error("Invalid arguments for tool '{tool}': {}", .violations.join("; "))]
    Validation {
        tool: String,
        violations: Vec<String>,
    },

    #[error("Unknown tool requested: {0}")]
    UnknownTool(String),

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event consumer went away; nothing more may be emitted.
    #[error("Client disconnected")]
    Cancelled,
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn input(msg: impl Into<String>) -> Self {
        Error::Input {
            message: msg.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::backend_with_context(msg, ErrorContext::new())
    }

    pub fn backend_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Backend {
            message: msg.into(),
            context,
        }
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Category reported on the wire for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Input { .. } => ErrorKind::InputError,
            Error::Configuration { .. } => ErrorKind::ConfigurationError,
            Error::Validation { .. } => ErrorKind::ValidationError,
            Error::UnknownTool(_) => ErrorKind::UnknownToolError,
            Error::Backend { .. }
            | Error::Remote { .. }
            | Error::Timeout { .. }
            | Error::Transport(_)
            | Error::Serialization(_)
            | Error::Cancelled => ErrorKind::BackendError,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Backend { context, .. } => Some(context),
            _ => None,
        }
    }
}
