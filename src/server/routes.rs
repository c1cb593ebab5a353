use super::AppState;
use crate::types::{ChatRequest, WorkflowEvent};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::pin::Pin;
use tokio_stream::StreamExt;

type SseStream = Pin<Box<dyn tokio_stream::Stream<Item = Result<Event, Infallible>> + Send>>;
type ApiError = (StatusCode, Json<Value>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
        .route("/{workflow}/chat/completions", post(chat_completions))
}

async fn chat_completions(
    Path(workflow): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<KeepAliveStream<SseStream>>, ApiError> {
    let Some(orchestrator) = state.workflows.get(&workflow) else {
        return Err((StatusCode::NOT_FOUND, Json(json!({"detail": "Not found"}))));
    };

    tracing::info!(
        workflow = %workflow,
        messages = request.messages.len(),
        model = %request.model,
        stream = request.stream,
        "chat completion request"
    );
    if !request.stream {
        tracing::warn!(workflow = %workflow, "non-streaming request rejected");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": format!("Streaming is required for {} generation", workflow)})),
        ));
    }

    let stream: SseStream = Box::pin(
        orchestrator
            .start(request)
            .map(|event| Ok::<_, Infallible>(sse_event(&event))),
    );
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// One SSE message per event. Carriage returns are not allowed in SSE data
/// fields, so line endings are normalized to `\n`.
pub fn sse_event(event: &WorkflowEvent) -> Event {
    let frame = event.to_wire().replace("\r\n", "\n").replace('\r', "\n");
    Event::default().data(frame)
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.workflows.registry.specs()))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "workflows": state.workflows.names(),
    }))
}
