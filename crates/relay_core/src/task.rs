use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// MIME type announced to the share target.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaKind::Image => "image/*",
            MediaKind::Video => "video/*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
}

/// One entry of a send task, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Message {
    Text(String),
    Image(String),
    Video(String),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Text(_) => MessageKind::Text,
            Message::Image(_) => MessageKind::Image,
            Message::Video(_) => MessageKind::Video,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Media kind and file path for image/video entries.
    pub fn media(&self) -> Option<(MediaKind, &str)> {
        match self {
            Message::Text(_) => None,
            Message::Image(path) => Some((MediaKind::Image, path)),
            Message::Video(path) => Some((MediaKind::Video, path)),
        }
    }

    fn payload(&self) -> &str {
        match self {
            Message::Text(s) | Message::Image(s) | Message::Video(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task has no recipients")]
    NoRecipients,
    #[error("recipient at position {0} is blank")]
    BlankRecipient(usize),
    #[error("task has no messages")]
    NoMessages,
    #[error("message at position {0} has empty content")]
    BlankMessage(usize),
}

/// Recipients in sending order plus the messages each of them receives.
///
/// Immutable once constructed; construction validates every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendTask {
    recipients: Vec<String>,
    messages: Vec<Message>,
}

impl SendTask {
    pub fn new(recipients: Vec<String>, messages: Vec<Message>) -> Result<Self, TaskError> {
        if recipients.is_empty() {
            return Err(TaskError::NoRecipients);
        }
        if let Some(pos) = recipients.iter().position(|r| r.trim().is_empty()) {
            return Err(TaskError::BlankRecipient(pos));
        }
        if messages.is_empty() {
            return Err(TaskError::NoMessages);
        }
        if let Some(pos) = messages.iter().position(|m| m.payload().trim().is_empty()) {
            return Err(TaskError::BlankMessage(pos));
        }
        Ok(Self {
            recipients,
            messages,
        })
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn recipient(&self, position: usize) -> Option<&str> {
        self.recipients.get(position).map(String::as_str)
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }
}

#[derive(Deserialize)]
struct RawSendTask {
    recipients: Vec<String>,
    messages: Vec<Message>,
}

impl<'de> Deserialize<'de> for SendTask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawSendTask::deserialize(deserializer)?;
        SendTask::new(raw.recipients, raw.messages).map_err(serde::de::Error::custom)
    }
}
