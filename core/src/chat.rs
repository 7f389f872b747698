use crate::api::{ApiClient, ApiError};
use crate::clipboard::{Clipboard, CopyTracker};
use crate::export::TranscriptExport;
use crate::state::{Message, Transcript, TranscriptStatus};
use crate::templates;
use crate::voice::{append_utterance, Dictation, VoiceToggle};
use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const SESSION_TITLE_CHARS: usize = 50;
const DEFAULT_SESSION_TITLE: &str = "New Chat";
const SESSION_CREATE_FAILED: &str = "Failed to create chat session";
const SEND_FAILED: &str = "Failed to send message. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty text, or another send was still in flight.
    Ignored,
    Delivered(Message),
    RolledBack(String),
}

#[derive(Default)]
struct ChatState {
    transcript: Transcript,
    session_id: Option<String>,
    draft: String,
}

/// Drives one chat transcript against the backend.
///
/// Holds the message list, the lazily created backend session, the draft
/// being typed, and the clipboard and voice capabilities the view needs.
#[derive(Clone)]
pub struct TranscriptController {
    inner: Arc<RwLock<ChatState>>,
    api: ApiClient,
    clipboard: Arc<dyn Clipboard>,
    copies: CopyTracker,
    dictation: Arc<Dictation>,
}

impl TranscriptController {
    pub fn new(api: ApiClient, clipboard: Arc<dyn Clipboard>, dictation: Dictation) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ChatState::default())),
            api,
            clipboard,
            copies: CopyTracker::default(),
            dictation: Arc::new(dictation),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.read().transcript.messages().to_vec()
    }

    pub fn status(&self) -> TranscriptStatus {
        self.inner.read().transcript.status().clone()
    }

    pub fn is_sending(&self) -> bool {
        self.inner.read().transcript.is_sending()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.read().session_id.clone()
    }

    pub fn draft(&self) -> String {
        self.inner.read().draft.clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.inner.write().draft = text.into();
    }

    /// Replace the draft with a quick-start template (1-based).
    pub fn apply_template(&self, number: usize) -> Option<&'static str> {
        let template = templates::template(number)?;
        self.set_draft(template);
        Some(template)
    }

    /// The most recent failure, from sending or from voice input.
    ///
    /// Each source clears the other when it records a failure or starts a new
    /// attempt, so at most one of them holds an error.
    pub fn error(&self) -> Option<String> {
        let transcript_error = self.inner.read().transcript.error().map(str::to_owned);
        transcript_error.or_else(|| self.dictation.error())
    }

    pub fn dismiss_error(&self) {
        self.inner.write().transcript.clear_error();
        self.dictation.dismiss_error();
    }

    pub async fn send_draft(&self) -> SendOutcome {
        let draft = {
            let mut inner = self.inner.write();
            if inner.transcript.is_sending() || inner.draft.trim().is_empty() {
                return SendOutcome::Ignored;
            }
            std::mem::take(&mut inner.draft)
        };
        self.send_message(&draft).await
    }

    /// Optimistically append `text`, then deliver it.
    ///
    /// The first send creates the backend chat session. On any failure the
    /// optimistic message is removed again and its text goes back into an
    /// empty draft.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let prompt = text.trim();
        if prompt.is_empty() {
            return SendOutcome::Ignored;
        }

        let (pending_id, session_id) = {
            let mut inner = self.inner.write();
            match inner.transcript.begin(Message::user(prompt)) {
                Ok(id) => (id, inner.session_id.clone()),
                Err(_) => return SendOutcome::Ignored,
            }
        };
        self.dictation.dismiss_error();

        let session_id = match session_id {
            Some(id) => id,
            None => match self.create_session(prompt).await {
                Ok(id) => id,
                Err(err) => {
                    warn!(%err, "failed to create chat session");
                    let message = match &err {
                        ApiError::Expired { .. } => err.user_message(),
                        _ => SESSION_CREATE_FAILED.to_string(),
                    };
                    return self.roll_back(pending_id, message);
                }
            },
        };

        match self.api.chat(prompt, &session_id).await {
            Ok(reply) => {
                let reply = Message::assistant(reply);
                let committed = self.inner.write().transcript.commit(reply.clone());
                match committed {
                    Ok(()) => SendOutcome::Delivered(reply),
                    Err(err) => self.roll_back(pending_id, err.to_string()),
                }
            }
            Err(err) => {
                warn!(%err, session_id = %session_id, "chat request failed");
                let message = err
                    .server_message()
                    .map(str::to_owned)
                    .unwrap_or_else(|| match &err {
                        ApiError::Expired { .. } => err.user_message(),
                        _ => SEND_FAILED.to_string(),
                    });
                self.roll_back(pending_id, message)
            }
        }
    }

    async fn create_session(&self, prompt: &str) -> Result<String, ApiError> {
        let title = session_title(prompt);
        let id = self.api.create_chat_session(&title).await?;
        info!(session_id = %id, "created chat session");
        let mut inner = self.inner.write();
        Ok(inner.session_id.get_or_insert(id).clone())
    }

    fn roll_back(&self, pending_id: Uuid, message: String) -> SendOutcome {
        self.dictation.dismiss_error();
        let mut inner = self.inner.write();
        match inner.transcript.roll_back(message.clone()) {
            Ok(removed) => {
                debug_assert_eq!(removed.id, pending_id);
                if inner.draft.trim().is_empty() {
                    inner.draft = removed.content;
                }
            }
            Err(err) => warn!(%err, "nothing to roll back"),
        }
        SendOutcome::RolledBack(message)
    }

    /// The export document for the transcript as it is right now.
    pub fn export_transcript(&self) -> TranscriptExport {
        let user = self.api.session().user().map(|user| user.full_name);
        let inner = self.inner.read();
        TranscriptExport::build(user.as_deref(), inner.transcript.messages(), Utc::now())
    }

    /// Write the export into `dir`; `None` when there is nothing to export.
    pub fn export_to_dir(&self, dir: &Path) -> Result<Option<PathBuf>> {
        if self.inner.read().transcript.is_empty() {
            return Ok(None);
        }
        let export = self.export_transcript();
        let path = export.write_to_dir(dir, Utc::now().date_naive())?;
        info!(path = %path.display(), messages = export.messages.len(), "exported transcript");
        Ok(Some(path))
    }

    pub async fn copy_message(&self, content: &str, id: Uuid) -> Result<()> {
        match self.clipboard.set_text(content).await {
            Ok(()) => {
                self.copies.mark(id);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "failed to copy message");
                Err(err)
            }
        }
    }

    /// The message whose "copied" acknowledgement is still showing.
    pub fn copied_message(&self) -> Option<Uuid> {
        self.copies.copied()
    }

    pub fn voice_supported(&self) -> bool {
        self.dictation.supported()
    }

    pub fn is_listening(&self) -> bool {
        self.dictation.is_listening()
    }

    pub async fn toggle_voice(&self) -> VoiceToggle {
        self.inner.write().transcript.clear_error();
        self.dictation.toggle().await
    }

    /// Fold finished recognitions into the draft. Returns true if it changed.
    pub fn poll_voice(&self) -> bool {
        let recognized = self.dictation.drain();
        let mut inner = self.inner.write();
        if recognized.failed {
            inner.transcript.clear_error();
        }
        if recognized.utterances.is_empty() {
            return false;
        }
        for utterance in recognized.utterances {
            inner.draft = append_utterance(&inner.draft, &utterance);
        }
        true
    }

    pub fn placeholder(&self) -> &'static str {
        if self.voice_supported() {
            "Type your message here or use voice input..."
        } else {
            "Type your message here..."
        }
    }
}

fn session_title(prompt: &str) -> String {
    let title: String = prompt.chars().take(SESSION_TITLE_CHARS).collect();
    if title.is_empty() {
        DEFAULT_SESSION_TITLE.to_string()
    } else {
        title
    }
}
