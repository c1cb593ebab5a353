//! HTTP surface through the router, without binding a socket.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chat_workflows::client::ModelResponse;
use chat_workflows::server::{build_router, AppState};
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(model: std::sync::Arc<ScriptedModelClient>) -> axum::Router {
    build_router(AppState::new(workflows(model, StaticImageBackend::new(&["AAA"]))))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn sse_frames(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_non_streaming_request_rejected() {
    let model = ScriptedModelClient::new(vec![]);
    let response = app(model.clone())
        .oneshot(post_json(
            "/recipe/chat/completions",
            json!({"messages": [{"role": "user", "content": "Nudeln"}], "stream": false}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["detail"], "Streaming is required for recipe generation");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_unknown_workflow_is_404() {
    let response = app(ScriptedModelClient::new(vec![]))
        .oneshot(post_json(
            "/poetry/chat/completions",
            json!({"messages": [{"role": "user", "content": "x"}], "stream": true}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["detail"], "Not found");
}

#[tokio::test]
async fn test_streaming_response_frames() {
    let model = ScriptedModelClient::new(vec![Ok(ModelResponse::text("Hallo!\r\nWie geht's?"))]);
    let response = app(model)
        .oneshot(post_json(
            "/assistant/chat/completions",
            json!({"model": "assistant", "messages": [{"role": "user", "content": "Hi"}], "stream": true}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"), "{}", content_type);

    let body = body_string(response).await;
    let frames = sse_frames(&body);
    // Multi-line text is split across consecutive data lines.
    assert_eq!(frames[0], "Hallo!");
    assert_eq!(frames[1], "Wie geht's?");
    let last: Value = serde_json::from_str(frames.last().unwrap()).unwrap();
    assert_eq!(last, json!({"type": "complete", "text": "✅ Fertig!"}));
}

#[tokio::test]
async fn test_streaming_error_frame() {
    let response = app(ScriptedModelClient::new(vec![]))
        .oneshot(post_json(
            "/recipe/chat/completions",
            json!({"messages": [{"role": "user", "content": "   "}], "stream": true}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let frames = sse_frames(&body_string(response).await);
    assert_eq!(frames.len(), 1);
    let frame: Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["kind"], "input_error");
    assert!(frame["text"].as_str().unwrap().contains("verfügbaren Zutaten"));
}

#[tokio::test]
async fn test_health_lists_workflows() {
    let response = app(ScriptedModelClient::new(vec![]))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["workflows"], json!(["assistant", "image", "recipe"]));
}

#[tokio::test]
async fn test_tools_endpoint_lists_specs() {
    let response = app(ScriptedModelClient::new(vec![]))
        .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|spec| spec["function"]["name"].as_str().unwrap())
        .collect();
    for expected in ["create_image", "cat_fact", "dog_image", "advice", "daily_inspiration"] {
        assert!(names.contains(&expected), "{:?}", names);
    }
}
