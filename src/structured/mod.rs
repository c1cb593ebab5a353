//! Structured output and tool-argument schemas.
//!
//! - [`ResponseSchema`]: schema-constrained model output (`response_format`)
//! - [`ObjectSchema`] / [`schema_for_type`]: JSON schema construction
//! - [`ArgumentValidator`]: validates tool arguments before a handler runs
//!
//! # Examples
//!
//! ```
//! use chat_workflows::structured::{ArgumentValidator, ObjectSchema};
//! use serde_json::json;
//!
//! let schema = ObjectSchema::new()
//!     .required("prompt", json!({"type": "string"}))
//!     .build();
//!
//! let validator = ArgumentValidator::compile(&schema).unwrap();
//! assert!(validator.validate(&json!({"prompt": "a red fox"})).is_ok());
//! assert!(validator.validate(&json!({})).is_err());
//! ```

pub mod response_format;
pub mod schema;
pub mod validator;

pub use response_format::ResponseSchema;
pub use schema::{schema_for_type, ObjectSchema};
pub use validator::ArgumentValidator;
