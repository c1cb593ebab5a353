//! Outbound HTTP plumbing shared by model, image and REST backends.

pub mod http;

pub use http::{build_client, HttpClientOptions, RestClient, TransportError};
