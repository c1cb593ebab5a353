//! HTTP backends against a mock server.

use chat_workflows::client::{ModelClient, ModelMessage, ModelRequest, OpenAiClient};
use chat_workflows::structured::ResponseSchema;
use chat_workflows::tools::{ImageArgs, ImageBackend, TogetherImageBackend};
use chat_workflows::transport::RestClient;
use chat_workflows::{Error, ErrorKind, ToolCall};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_openai_client_parses_tool_calls() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({"model": "gpt-4o", "tool_choice": "auto"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": "Einen Moment.",
                    "tool_calls": [{"id": "call_9", "type": "function",
                        "function": {"name": "create_image",
                                     "arguments": "{\"prompt\":\"fox\",\"width\":512,\"height\":512,\"num_images\":1}"}}]
                }}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OpenAiClient::new(format!("{}/v1/", server.url()), Some("sk-test".into())).unwrap();
    let request = ModelRequest::new("gpt-4o", vec![ModelMessage::user("Fuchs")]).tools(vec![
        chat_workflows::types::ToolSpec::function("create_image", "img", json!({"type": "object"})),
    ]);
    let response = client.complete(request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content.as_deref(), Some("Einen Moment."));
    assert_eq!(response.tool_calls.len(), 1);
    let call: &ToolCall = &response.tool_calls[0];
    assert_eq!(call.id, "call_9");
    assert_eq!(call.parsed_arguments().unwrap()["prompt"], "fox");
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(15));
}

#[tokio::test]
async fn test_openai_client_structured_output() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "response_format": {"type": "json_schema", "json_schema": {"name": "recipe"}}
        })))
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": "{\"recipe_name\": \"Pasta\"}"}}]}).to_string())
        .create_async()
        .await;

    let client = OpenAiClient::new(server.url(), Some("k".into())).unwrap();
    let request = ModelRequest::new("gpt-4.1", vec![ModelMessage::user("x")])
        .response_schema(ResponseSchema::new("recipe", json!({"type": "object"})));
    let response = client.complete(request).await.unwrap();
    assert_eq!(response.structured, Some(json!({"recipe_name": "Pasta"})));
}

#[tokio::test]
async fn test_openai_client_http_error_is_remote() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"invalid api key"}}"#)
        .create_async()
        .await;

    let client = OpenAiClient::new(server.url(), Some("bad".into())).unwrap();
    let err = client
        .complete(ModelRequest::new("gpt-4o", vec![ModelMessage::user("x")]))
        .await
        .unwrap_err();
    match &err {
        Error::Remote { status, message } => {
            assert_eq!(*status, 401);
            assert!(message.contains("invalid api key"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(err.kind(), ErrorKind::BackendError);
}

#[tokio::test]
async fn test_together_backend_returns_base64_images() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/images/generations")
        .match_header("authorization", "Bearer tg-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "black-forest-labs/FLUX.1-dev",
            "prompt": "a red fox",
            "n": 2,
            "width": 512,
            "height": 768,
            "response_format": "b64_json"
        })))
        .with_status(200)
        .with_body(json!({"data": [{"b64_json": "AAA"}, {"b64_json": "BBB"}]}).to_string())
        .create_async()
        .await;

    let backend = TogetherImageBackend::new(
        server.url(),
        Some("tg-key".into()),
        "black-forest-labs/FLUX.1-dev",
        Duration::from_secs(5),
    )
    .unwrap();
    let images = backend
        .generate(&ImageArgs {
            prompt: "a red fox".into(),
            width: 512,
            height: 768,
            num_images: 2,
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(images, vec!["AAA", "BBB"]);
}

#[tokio::test]
async fn test_rest_client_status_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/fact")
        .with_status(503)
        .with_body("down for maintenance")
        .create_async()
        .await;

    let client = RestClient::new(Duration::from_secs(5)).unwrap();
    let err = client
        .get_json(&format!("{}/fact", server.url()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote { status: 503, .. }));
}
