use std::fmt;

use crate::MessageKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: String,
    pub index: usize,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Media file was gone when the hand-off started.
    ResourceMissing,
    /// A UI step kept failing until its attempt budget ran out.
    StepExhausted { step: &'static str },
    /// The share surface never reached the confirm control.
    HandOffStalled,
    /// The target application never came to the foreground.
    TargetUnavailable,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ResourceMissing => write!(f, "media file missing"),
            FailureReason::StepExhausted { step } => write!(f, "step {step} exhausted its attempts"),
            FailureReason::HandOffStalled => write!(f, "media hand-off stalled"),
            FailureReason::TargetUnavailable => write!(f, "target application unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub recipient: String,
    pub index: usize,
    pub reason: FailureReason,
}

/// Outcome of a task, accumulated while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskReport {
    pub recipients: usize,
    pub messages: usize,
    pub delivered: Vec<Delivery>,
    pub failed: Vec<Failure>,
}

impl TaskReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.delivered.len() == self.recipients * self.messages
    }
}

/// Status notifications for the caller of a send task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Started { recipients: usize, messages: usize },
    RecipientStarted { recipient: String, position: usize },
    Delivered(Delivery),
    Skipped(Failure),
    Finished(TaskReport),
    Stopped(TaskReport),
}
