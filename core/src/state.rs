use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(rename = "bot", alias = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptStatus {
    Idle,
    Sending,
    Error(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("a message is already being sent")]
    Busy,
    #[error("message {0} is already in the transcript")]
    DuplicateId(Uuid),
    #[error("no message is pending")]
    NothingPending,
}

/// One conversation's messages plus the state of the send in flight.
///
/// A send moves through `begin` (optimistic append, status `Sending`) and
/// then exactly one of `commit` or `roll_back`. Only one message can be
/// pending at a time.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    pending: Option<Uuid>,
    status: TranscriptStatus,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            pending: None,
            status: TranscriptStatus::Idle,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn status(&self) -> &TranscriptStatus {
        &self.status
    }

    pub fn is_sending(&self) -> bool {
        self.status == TranscriptStatus::Sending
    }

    pub fn pending(&self) -> Option<&Message> {
        let id = self.pending?;
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            TranscriptStatus::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn clear_error(&mut self) {
        if matches!(self.status, TranscriptStatus::Error(_)) {
            self.status = TranscriptStatus::Idle;
        }
    }

    /// Optimistically append the user's message and enter `Sending`.
    pub fn begin(&mut self, message: Message) -> Result<Uuid, TranscriptError> {
        if self.is_sending() {
            return Err(TranscriptError::Busy);
        }
        let id = message.id;
        self.push(message)?;
        self.pending = Some(id);
        self.status = TranscriptStatus::Sending;
        Ok(id)
    }

    /// Keep the pending message and append the reply.
    pub fn commit(&mut self, reply: Message) -> Result<(), TranscriptError> {
        if self.pending.is_none() {
            return Err(TranscriptError::NothingPending);
        }
        self.push(reply)?;
        self.pending = None;
        self.status = TranscriptStatus::Idle;
        Ok(())
    }

    /// Remove the pending message and record why the send failed.
    pub fn roll_back(&mut self, error: impl Into<String>) -> Result<Message, TranscriptError> {
        let id = self.pending.take().ok_or(TranscriptError::NothingPending)?;
        let position = self
            .messages
            .iter()
            .position(|message| message.id == id)
            .ok_or(TranscriptError::NothingPending)?;
        let removed = self.messages.remove(position);
        self.status = TranscriptStatus::Error(error.into());
        Ok(removed)
    }

    fn push(&mut self, message: Message) -> Result<(), TranscriptError> {
        if self.messages.iter().any(|existing| existing.id == message.id) {
            return Err(TranscriptError::DuplicateId(message.id));
        }
        self.messages.push(message);
        Ok(())
    }
}
