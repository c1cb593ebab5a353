//! HTTP surface: SSE chat-completion endpoints per workflow.

pub mod routes;

use crate::config::Settings;
use crate::workflow::Workflows;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub workflows: Arc<Workflows>,
}

impl AppState {
    pub fn new(workflows: Workflows) -> Self {
        Self {
            workflows: Arc::new(workflows),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(settings: &Settings, state: AppState) -> crate::Result<()> {
    let addr: SocketAddr = settings.bind_address().parse().map_err(|e| {
        crate::Error::configuration_with_context(
            format!("invalid bind address '{}'", settings.bind_address()),
            crate::ErrorContext::new()
                .with_field_path("server")
                .with_details(format!("{}", e)),
        )
    })?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        crate::Error::configuration(format!("failed to bind to {}: {}", addr, e))
    })?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| crate::Error::configuration(format!("failed to get local address: {}", e)))?;
    tracing::info!("workflow server listening on {}", local_addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| crate::Error::backend(format!("server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
