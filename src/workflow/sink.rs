//! Per-request event channel.

use crate::types::WorkflowEvent;
use crate::{Error, Result};
use tokio::sync::mpsc;

/// Producer half of one request's event stream.
///
/// Steps and tool handlers emit non-terminal events only; the terminal
/// `Complete`/`ErrorText` is reserved for the orchestrator. A send fails with
/// [`Error::Cancelled`] once the consumer has gone away.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<WorkflowEvent>,
}

impl EventSink {
    /// Bounded channel holding at most `buffer` undelivered events.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    pub async fn emit(&self, event: WorkflowEvent) -> Result<()> {
        if event.is_terminal() {
            return Err(Error::backend(
                "terminal events are emitted by the orchestrator only",
            ));
        }
        self.send(event).await
    }

    pub async fn status(&self, phase: &str, message: impl Into<String>) -> Result<()> {
        self.emit(WorkflowEvent::status(phase, message)).await
    }

    pub async fn text(&self, text: impl Into<String>) -> Result<()> {
        self.emit(WorkflowEvent::text(text)).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has dropped its receiver.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub(crate) async fn finish(&self, event: WorkflowEvent) -> Result<()> {
        self.send(event).await
    }

    async fn send(&self, event: WorkflowEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::Cancelled)
    }
}
