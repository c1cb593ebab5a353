//! Shared fixtures: scripted model client, spy tools and image backends.

#![allow(dead_code)]

use async_trait::async_trait;
use chat_workflows::client::{ModelClient, ModelRequest, ModelResponse};
use chat_workflows::config::Settings;
use chat_workflows::tools::{ExternalApis, ImageArgs, ImageBackend, ToolHandler};
use chat_workflows::transport::RestClient;
use chat_workflows::workflow::{Backends, Orchestrator, Workflows};
use chat_workflows::{ChatRequest, Error, EventSink, Message, Result, WorkflowEvent};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::StreamExt;

/// Model client answering from a fixed script, recording every request.
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
    configured: bool,
    delay: Option<Duration>,
}

impl ScriptedModelClient {
    pub fn new(replies: Vec<Result<ModelResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            configured: true,
            delay: None,
        })
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            configured: false,
            delay: None,
        })
    }

    pub fn slow(delay: Duration, reply: ModelResponse) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(vec![Ok(reply)].into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            configured: true,
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::backend("script exhausted")))
    }
}

/// Image backend returning fixed base64 strings.
pub struct StaticImageBackend {
    images: Vec<String>,
    pub calls: AtomicUsize,
}

impl StaticImageBackend {
    pub fn new(images: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            images: images.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageBackend for StaticImageBackend {
    async fn generate(&self, args: &ImageArgs) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .images
            .iter()
            .cycle()
            .take(args.num_images as usize)
            .cloned()
            .collect())
    }
}

/// Tool handler that only counts invocations.
#[derive(Default)]
pub struct SpyTool {
    calls: AtomicUsize,
}

impl SpyTool {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolHandler for SpyTool {
    async fn call(&self, arguments: Value, events: &EventSink) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        events.text("spy called").await?;
        Ok(json!({"echo": arguments}))
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.limits.model_timeout_secs = 5;
    settings.limits.tool_timeout_secs = 5;
    settings.limits.pipeline_timeout_secs = 20;
    settings
}

pub fn workflows(model: Arc<ScriptedModelClient>, images: Arc<StaticImageBackend>) -> Workflows {
    workflows_with_apis(model, images, ExternalApis::with_base("http://127.0.0.1:9"))
}

pub fn workflows_with_apis(
    model: Arc<ScriptedModelClient>,
    images: Arc<StaticImageBackend>,
    apis: ExternalApis,
) -> Workflows {
    let backends = Backends {
        model,
        images,
        rest: RestClient::new(Duration::from_secs(5)).unwrap(),
        apis,
    };
    Workflows::build(&test_settings(), backends).unwrap()
}

pub async fn run(orchestrator: &Orchestrator, input: &str) -> Vec<WorkflowEvent> {
    run_request(orchestrator, ChatRequest::new(vec![Message::user(input)])).await
}

pub async fn run_request(orchestrator: &Orchestrator, request: ChatRequest) -> Vec<WorkflowEvent> {
    orchestrator.start(request).collect().await
}

/// Exactly one terminal event, and it is the last one.
pub fn assert_single_terminal(events: &[WorkflowEvent]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "events: {:#?}", events);
    assert!(events.last().is_some_and(|e| e.is_terminal()), "events: {:#?}", events);
}
