//! Progress events emitted by the Executor, replacing the teacher's
//! callback/event-emitter pattern with a plain mpsc channel the CLI consumes
//! to render progress (Design Notes §9).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SymphonyStarted,
    MovementStarted,
    ToolCalled,
    VerificationRan,
    ModelSwitched,
    MovementRetried,
    MovementSucceeded,
    MovementFailed,
    SymphonyFinished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorEvent {
    pub kind: EventKind,
    pub message: String,
    pub movement_id: Option<String>,
    pub attempt: Option<u32>,
}

impl ExecutorEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        ExecutorEvent { kind, message: message.into(), movement_id: None, attempt: None }
    }

    pub fn for_movement(mut self, movement_id: impl Into<String>) -> Self {
        self.movement_id = Some(movement_id.into());
        self
    }

    pub fn at_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }
}

pub type EventSender = mpsc::UnboundedSender<ExecutorEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ExecutorEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
