//! Workflow events and their wire framing.
//!
//! Every event maps to exactly one frame:
//!
//! | Event | Frame |
//! |-------|-------|
//! | `TextChunk` | the raw UTF-8 text |
//! | `Status` | `{"type":"status","phase":…,"text":…}` |
//! | `Complete` | `{"type":"complete","text":…}` |
//! | `ErrorText` | `{"type":"error","kind":…,"text":…}` |
//! | `StructuredPayload` | `{"type":<kind>, …fields}` |
//!
//! Parsing is forward compatible: anything that is not a JSON object with a
//! known `type` comes back as a `TextChunk` holding the raw frame.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload kinds this crate knows how to parse back from the wire.
pub const KNOWN_PAYLOAD_KINDS: &[&str] = &[GeneratedImage::KIND];

/// One discrete unit of the streamed output.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Informational progress update (non-terminal).
    Status { phase: String, message: String },
    /// Generated natural-language output.
    TextChunk { text: String },
    /// Typed artifact, e.g. a generated image.
    StructuredPayload {
        kind: String,
        fields: Map<String, Value>,
    },
    /// Terminal success marker.
    Complete { message: String },
    /// Terminal in-band failure.
    ErrorText { kind: ErrorKind, text: String },
}

impl WorkflowEvent {
    pub fn status(phase: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowEvent::Status {
            phase: phase.into(),
            message: message.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        WorkflowEvent::TextChunk { text: text.into() }
    }

    pub fn payload(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        WorkflowEvent::StructuredPayload {
            kind: kind.into(),
            fields,
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        WorkflowEvent::Complete {
            message: message.into(),
        }
    }

    pub fn error(kind: ErrorKind, text: impl Into<String>) -> Self {
        WorkflowEvent::ErrorText {
            kind,
            text: text.into(),
        }
    }

    /// `Complete` and `ErrorText` end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::Complete { .. } | WorkflowEvent::ErrorText { .. }
        )
    }

    /// Serialize into a single wire frame.
    pub fn to_wire(&self) -> String {
        match self {
            WorkflowEvent::TextChunk { text } => text.clone(),
            WorkflowEvent::Status { phase, message } => serde_json::json!({
                "type": "status",
                "phase": phase,
                "text": message,
            })
            .to_string(),
            WorkflowEvent::Complete { message } => serde_json::json!({
                "type": "complete",
                "text": message,
            })
            .to_string(),
            WorkflowEvent::ErrorText { kind, text } => serde_json::json!({
                "type": "error",
                "kind": kind.as_str(),
                "text": text,
            })
            .to_string(),
            WorkflowEvent::StructuredPayload { kind, fields } => {
                let mut frame = Map::with_capacity(fields.len() + 1);
                frame.insert("type".to_string(), Value::String(kind.clone()));
                for (k, v) in fields {
                    if k != "type" {
                        frame.insert(k.clone(), v.clone());
                    }
                }
                Value::Object(frame).to_string()
            }
        }
    }

    /// Parse a wire frame. Unknown or malformed frames fall back to text.
    pub fn from_wire(frame: &str) -> Self {
        Self::parse_tagged(frame).unwrap_or_else(|| WorkflowEvent::text(frame))
    }

    fn parse_tagged(frame: &str) -> Option<Self> {
        let trimmed = frame.trim_start();
        if !trimmed.starts_with('{') {
            return None;
        }
        let Value::Object(mut obj) = serde_json::from_str::<Value>(trimmed).ok()? else {
            return None;
        };
        let Some(Value::String(kind)) = obj.remove("type") else {
            return None;
        };

        let text_field = |obj: &Map<String, Value>| -> Option<String> {
            obj.get("text").and_then(|t| t.as_str()).map(str::to_string)
        };

        match kind.as_str() {
            "status" => Some(WorkflowEvent::Status {
                phase: obj
                    .get("phase")
                    .and_then(|p| p.as_str())
                    .unwrap_or_default()
                    .to_string(),
                message: text_field(&obj)?,
            }),
            "complete" => Some(WorkflowEvent::Complete {
                message: text_field(&obj).unwrap_or_default(),
            }),
            "error" => Some(WorkflowEvent::ErrorText {
                kind: obj
                    .get("kind")
                    .cloned()
                    .and_then(|k| serde_json::from_value(k).ok())
                    .unwrap_or(ErrorKind::BackendError),
                text: text_field(&obj)?,
            }),
            other if KNOWN_PAYLOAD_KINDS.contains(&other) => Some(WorkflowEvent::StructuredPayload {
                kind: other.to_string(),
                fields: obj,
            }),
            _ => None,
        }
    }
}

/// Descriptor of one generated image, streamed as a `StructuredPayload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

impl GeneratedImage {
    pub const KIND: &'static str = "image";

    /// Wrap base64 PNG data as a data URL.
    pub fn from_base64_png(b64: &str, prompt: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: format!("data:image/png;base64,{}", b64),
            prompt: prompt.into(),
            width,
            height,
        }
    }

    pub fn into_event(self) -> WorkflowEvent {
        let mut fields = Map::new();
        fields.insert("url".into(), Value::String(self.url));
        fields.insert("prompt".into(), Value::String(self.prompt));
        fields.insert("width".into(), Value::from(self.width));
        fields.insert("height".into(), Value::from(self.height));
        WorkflowEvent::payload(Self::KIND, fields)
    }

    pub fn from_event(event: &WorkflowEvent) -> Option<Self> {
        match event {
            WorkflowEvent::StructuredPayload { kind, fields } if kind == Self::KIND => {
                serde_json::from_value(Value::Object(fields.clone())).ok()
            }
            _ => None,
        }
    }
}
