//! Per-request pipeline driver.
//!
//! ```text
//! INTAKE -> VALIDATING -> MODEL_INVOKE -> (TOOL_DISPATCH -> TOOL_EXEC ->)? RESULT_FORMAT -> COMPLETE
//!    \___________\_____________\_______________\______________\_______________\-> FAILED
//! ```
//!
//! Each run owns a fresh [`StepContext`]; the plan and the tool registry are
//! shared read-only. Exactly one terminal event is emitted per run, unless
//! the consumer disconnects first, in which case nothing more is emitted.

use super::{EventSink, StepContext, StepOutcome, WorkflowStep};
use crate::tools::{PreparedCall, ToolRegistry};
use crate::types::{ChatRequest, WorkflowEvent};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Intake,
    Validating,
    ModelInvoke,
    ToolDispatch,
    ToolExec,
    ResultFormat,
    Complete,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Intake => "INTAKE",
            WorkflowState::Validating => "VALIDATING",
            WorkflowState::ModelInvoke => "MODEL_INVOKE",
            WorkflowState::ToolDispatch => "TOOL_DISPATCH",
            WorkflowState::ToolExec => "TOOL_EXEC",
            WorkflowState::ResultFormat => "RESULT_FORMAT",
            WorkflowState::Complete => "COMPLETE",
            WorkflowState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Static description of one workflow.
pub struct WorkflowPlan {
    pub name: String,
    /// `ErrorText` for blank input.
    pub empty_input_message: String,
    /// Prepended to every non-input error text.
    pub failure_prefix: Option<String>,
    pub completion_message: String,
    /// Runs in `VALIDATING` (credential checks, start status).
    pub preflight: Vec<Arc<dyn WorkflowStep>>,
    pub model: Arc<dyn WorkflowStep>,
    /// Tools the model may call; anything else is reported as unknown.
    pub tools: Vec<String>,
    /// Runs after the tool finished (e.g. result analysis).
    pub after_tool: Vec<Arc<dyn WorkflowStep>>,
    pub formatters: Vec<Arc<dyn WorkflowStep>>,
}

impl WorkflowPlan {
    pub fn new(name: impl Into<String>, model: Arc<dyn WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            empty_input_message: "Bitte geben Sie eine Nachricht ein.".to_string(),
            failure_prefix: None,
            completion_message: "✅ Fertig!".to_string(),
            preflight: Vec::new(),
            model,
            tools: Vec::new(),
            after_tool: Vec::new(),
            formatters: Vec::new(),
        }
    }

    pub fn empty_input_message(mut self, message: impl Into<String>) -> Self {
        self.empty_input_message = message.into();
        self
    }

    pub fn failure_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.failure_prefix = Some(prefix.into());
        self
    }

    pub fn completion_message(mut self, message: impl Into<String>) -> Self {
        self.completion_message = message.into();
        self
    }

    pub fn preflight(mut self, step: Arc<dyn WorkflowStep>) -> Self {
        self.preflight.push(step);
        self
    }

    pub fn tools(mut self, names: Vec<String>) -> Self {
        self.tools = names;
        self
    }

    pub fn after_tool(mut self, step: Arc<dyn WorkflowStep>) -> Self {
        self.after_tool.push(step);
        self
    }

    pub fn formatter(mut self, step: Arc<dyn WorkflowStep>) -> Self {
        self.formatters.push(step);
        self
    }

    /// In-band text for a failed run.
    pub fn error_text(&self, err: &Error) -> String {
        match (err, &self.failure_prefix) {
            (Error::Input { message }, _) => message.clone(),
            (_, Some(prefix)) => format!("{} {}", prefix, err),
            (_, None) => err.to_string(),
        }
    }
}

impl fmt::Debug for WorkflowPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowPlan")
            .field("name", &self.name)
            .field("tools", &self.tools)
            .field("preflight", &self.preflight.len())
            .field("after_tool", &self.after_tool.len())
            .field("formatters", &self.formatters.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorLimits {
    /// Undelivered events held per request before producers wait.
    pub event_buffer: usize,
    pub tool_timeout: Duration,
    /// Cap on the whole run.
    pub pipeline_timeout: Duration,
}

impl Default for OrchestratorLimits {
    fn default() -> Self {
        Self {
            event_buffer: 64,
            tool_timeout: Duration::from_secs(60),
            pipeline_timeout: Duration::from_secs(180),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    plan: Arc<WorkflowPlan>,
    tools: Arc<ToolRegistry>,
    limits: OrchestratorLimits,
}

impl Orchestrator {
    pub fn new(plan: WorkflowPlan, tools: Arc<ToolRegistry>, limits: OrchestratorLimits) -> Self {
        Self {
            plan: Arc::new(plan),
            tools,
            limits,
        }
    }

    pub fn name(&self) -> &str {
        &self.plan.name
    }

    pub fn plan(&self) -> &WorkflowPlan {
        &self.plan
    }

    /// Spawn the pipeline on its own task and return its event stream.
    ///
    /// Dropping the stream cancels the run at its next suspension point.
    pub fn start(&self, request: ChatRequest) -> ReceiverStream<WorkflowEvent> {
        let (events, rx) = EventSink::channel(self.limits.event_buffer);
        let this = self.clone();
        tokio::spawn(async move { this.run(request, events).await });
        ReceiverStream::new(rx)
    }

    /// Run the pipeline to its terminal event on the current task.
    pub async fn run(&self, request: ChatRequest, events: EventSink) {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("workflow", name = %self.plan.name, request_id = %request_id);

        async move {
            tracing::info!(messages = request.messages.len(), "workflow started");
            let mut ctx = StepContext::new(request);
            let mut state = WorkflowState::Intake;
            let limit = self.limits.pipeline_timeout;

            let result = tokio::select! {
                _ = events.closed() => Err(Error::Cancelled),
                outcome = tokio::time::timeout(limit, self.drive(&mut ctx, &events, &mut state)) => {
                    outcome.unwrap_or_else(|_| Err(Error::timeout("workflow", limit)))
                }
            };

            let terminal = match result {
                Ok(()) => {
                    tracing::info!("workflow completed");
                    WorkflowEvent::complete(self.plan.completion_message.clone())
                }
                Err(Error::Cancelled) => {
                    tracing::info!(state = %state, "client disconnected, abandoning workflow");
                    return;
                }
                Err(err) => {
                    match err.kind() {
                        crate::error::ErrorKind::InputError => {
                            tracing::warn!(state = %state, error = %err, "rejected input")
                        }
                        _ => tracing::error!(state = %state, error = %err, "workflow failed"),
                    }
                    state = WorkflowState::Failed;
                    tracing::debug!(state = %state, "terminal state");
                    WorkflowEvent::error(err.kind(), self.plan.error_text(&err))
                }
            };

            if events.finish(terminal).await.is_err() {
                tracing::debug!("consumer gone before terminal event");
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        ctx: &mut StepContext,
        events: &EventSink,
        state: &mut WorkflowState,
    ) -> Result<()> {
        let mut prepared: Option<PreparedCall> = None;

        loop {
            tracing::debug!(state = %state, "entering state");
            *state = match *state {
                WorkflowState::Intake => {
                    if ctx.input.trim().is_empty() {
                        return Err(Error::input(self.plan.empty_input_message.clone()));
                    }
                    tracing::debug!(input = %crate::utils::preview(&ctx.input, 200), "user input");
                    WorkflowState::Validating
                }
                WorkflowState::Validating => {
                    match run_steps(&self.plan.preflight, ctx, events).await? {
                        StepOutcome::Continue => WorkflowState::ModelInvoke,
                        StepOutcome::Finish => WorkflowState::Complete,
                    }
                }
                WorkflowState::ModelInvoke => {
                    if self.plan.model.execute(ctx, events).await? == StepOutcome::Finish {
                        WorkflowState::Complete
                    } else {
                        self.surface_model_response(ctx, events).await?
                    }
                }
                WorkflowState::ToolDispatch => {
                    let call = ctx
                        .tool_call
                        .as_ref()
                        .ok_or_else(|| Error::backend("no tool call to dispatch"))?;
                    if !self.plan.tools.iter().any(|t| t == &call.name) {
                        tracing::warn!(tool = %call.name, "model requested a tool outside this workflow");
                        return Err(Error::UnknownTool(call.name.clone()));
                    }
                    prepared = Some(self.tools.prepare(call)?);
                    WorkflowState::ToolExec
                }
                WorkflowState::ToolExec => {
                    let call = prepared
                        .take()
                        .ok_or_else(|| Error::backend("tool call was not prepared"))?;
                    let running = call.definition.running_label();
                    let finished = call.definition.finished_label();

                    events.status(&running.phase, running.text).await?;
                    let result = self
                        .tools
                        .execute(call, events, self.limits.tool_timeout)
                        .await?;
                    ctx.tool_result = Some(result);
                    events.status(&finished.phase, finished.text).await?;

                    match run_steps(&self.plan.after_tool, ctx, events).await? {
                        StepOutcome::Continue => WorkflowState::ResultFormat,
                        StepOutcome::Finish => WorkflowState::Complete,
                    }
                }
                WorkflowState::ResultFormat => {
                    run_steps(&self.plan.formatters, ctx, events).await?;
                    WorkflowState::Complete
                }
                WorkflowState::Complete | WorkflowState::Failed => return Ok(()),
            };
        }
    }

    /// Emit direct model text and pick the tool call to dispatch, if any.
    async fn surface_model_response(
        &self,
        ctx: &mut StepContext,
        events: &EventSink,
    ) -> Result<WorkflowState> {
        let Some(response) = ctx.model_response.as_ref() else {
            return Ok(WorkflowState::ResultFormat);
        };

        if let Some(text) = response.content.as_deref().filter(|t| !t.is_empty()) {
            events.text(text).await?;
        }

        let mut calls = response.tool_calls.iter();
        let Some(first) = calls.next().cloned() else {
            tracing::info!("model answered without tool calls");
            return Ok(WorkflowState::ResultFormat);
        };
        let ignored: Vec<&str> = calls.map(|c| c.name.as_str()).collect();
        if !ignored.is_empty() {
            tracing::warn!(dispatched = %first.name, ?ignored, "only the first tool call is dispatched");
        }
        tracing::info!(tool = %first.name, "model requested tool");
        ctx.tool_call = Some(first);
        Ok(WorkflowState::ToolDispatch)
    }
}

async fn run_steps(
    steps: &[Arc<dyn WorkflowStep>],
    ctx: &mut StepContext,
    events: &EventSink,
) -> Result<StepOutcome> {
    for step in steps {
        tracing::debug!(step = step.name(), "running step");
        if step.execute(ctx, events).await? == StepOutcome::Finish {
            return Ok(StepOutcome::Finish);
        }
    }
    Ok(StepOutcome::Continue)
}
