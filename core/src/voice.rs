use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

pub const RECOGNITION_LOCALE: &str = "en-US";

const UNSUPPORTED_MESSAGE: &str = "Speech recognition is not supported on this platform.";
const UNAVAILABLE_MESSAGE: &str = "Speech recognition is not available.";

/// How a capture is configured: one utterance, final results only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub locale: String,
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u8,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            locale: RECOGNITION_LOCALE.to_string(),
            continuous: false,
            interim_results: false,
            max_alternatives: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    Aborted,
    Other(String),
}

impl RecognitionErrorKind {
    /// Map a platform error code (`no-speech`, `not-allowed`, ...) to a kind.
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "network" => Self::Network,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn message(&self) -> String {
        let detail = match self {
            Self::NoSpeech => "No speech was detected. Please try again.",
            Self::AudioCapture => "No microphone was found. Please check your microphone.",
            Self::NotAllowed => {
                "Microphone access was denied. Please allow microphone access and try again."
            }
            Self::Network => "Network error occurred. Please check your internet connection.",
            Self::Aborted => "Speech recognition was aborted.",
            Self::Other(_) => "Please try again.",
        };
        format!("Speech recognition failed. {detail}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Result(String),
    Error(RecognitionErrorKind),
    Ended,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MicrophoneError {
    #[error("microphone access not allowed")]
    NotAllowed,
    #[error("no microphone found")]
    NotFound,
    #[error("microphone unavailable: {0}")]
    Unavailable(String),
}

impl MicrophoneError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotAllowed => {
                "Microphone access denied. Please allow microphone access in your system settings."
            }
            Self::NotFound => "No microphone found. Please connect a microphone and try again.",
            Self::Unavailable(_) => {
                "Unable to access microphone. Please check your system settings."
            }
        }
    }
}

#[async_trait]
pub trait Microphone: Send + Sync {
    async fn request_access(&self) -> Result<(), MicrophoneError>;
}

/// A speech-to-text engine. Events for a capture are sent on the channel
/// given to `start`; a capture always finishes with `Ended`.
pub trait SpeechRecognizer: Send + Sync {
    fn supported(&self) -> bool;
    fn start(
        &self,
        options: &RecognitionOptions,
        events: UnboundedSender<RecognitionEvent>,
    ) -> Result<()>;
    fn stop(&self);
}

/// Used wherever no speech engine exists.
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn supported(&self) -> bool {
        false
    }

    fn start(
        &self,
        _options: &RecognitionOptions,
        _events: UnboundedSender<RecognitionEvent>,
    ) -> Result<()> {
        Err(anyhow::anyhow!("speech recognition is not supported"))
    }

    fn stop(&self) {}
}

pub struct NoMicrophone;

#[async_trait]
impl Microphone for NoMicrophone {
    async fn request_access(&self) -> Result<(), MicrophoneError> {
        Err(MicrophoneError::NotFound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceToggle {
    Started,
    Stopped,
    Unsupported,
    Failed,
}

/// What a batch of recognition events produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Recognized {
    pub utterances: Vec<String>,
    /// A capture failed; its message is in [`Dictation::error`].
    pub failed: bool,
}

#[derive(Default)]
struct DictationState {
    listening: bool,
    error: Option<String>,
}

/// Voice input for one draft: permission, start/stop, and event handling.
pub struct Dictation {
    recognizer: Arc<dyn SpeechRecognizer>,
    microphone: Arc<dyn Microphone>,
    options: RecognitionOptions,
    state: Mutex<DictationState>,
    events_tx: UnboundedSender<RecognitionEvent>,
    events_rx: Mutex<UnboundedReceiver<RecognitionEvent>>,
}

impl Dictation {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, microphone: Arc<dyn Microphone>) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            recognizer,
            microphone,
            options: RecognitionOptions::default(),
            state: Mutex::new(DictationState::default()),
            events_tx,
            events_rx: Mutex::new(events_rx),
        }
    }

    pub fn unsupported() -> Self {
        Self::new(Arc::new(UnsupportedRecognizer), Arc::new(NoMicrophone))
    }

    pub fn supported(&self) -> bool {
        self.recognizer.supported()
    }

    pub fn is_listening(&self) -> bool {
        self.state.lock().listening
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.state.lock().error = None;
    }

    pub async fn toggle(&self) -> VoiceToggle {
        if !self.recognizer.supported() {
            self.fail(UNSUPPORTED_MESSAGE);
            return VoiceToggle::Unsupported;
        }

        if self.is_listening() {
            self.recognizer.stop();
            self.state.lock().listening = false;
            return VoiceToggle::Stopped;
        }

        if let Err(err) = self.microphone.request_access().await {
            warn!(%err, "microphone access failed");
            self.fail(err.user_message());
            return VoiceToggle::Failed;
        }

        self.dismiss_error();
        match self.recognizer.start(&self.options, self.events_tx.clone()) {
            Ok(()) => {
                self.state.lock().listening = true;
                VoiceToggle::Started
            }
            Err(err) => {
                warn!(%err, "speech recognizer refused to start");
                self.fail(UNAVAILABLE_MESSAGE);
                VoiceToggle::Failed
            }
        }
    }

    /// Apply every event received so far.
    pub fn drain(&self) -> Recognized {
        let mut pending = Vec::new();
        {
            let mut rx = self.events_rx.lock();
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }
        let mut recognized = Recognized::default();
        for event in pending {
            recognized.failed |= matches!(event, RecognitionEvent::Error(_));
            recognized.utterances.extend(self.handle_event(event));
        }
        recognized
    }

    pub fn handle_event(&self, event: RecognitionEvent) -> Option<String> {
        debug!(?event, "recognition event");
        let mut state = self.state.lock();
        match event {
            RecognitionEvent::Started => {
                state.listening = true;
                state.error = None;
                None
            }
            RecognitionEvent::Result(text) => {
                let text = text.trim().to_string();
                (!text.is_empty()).then_some(text)
            }
            RecognitionEvent::Error(kind) => {
                state.listening = false;
                state.error = Some(kind.message());
                None
            }
            RecognitionEvent::Ended => {
                state.listening = false;
                None
            }
        }
    }

    fn fail(&self, message: &str) {
        let mut state = self.state.lock();
        state.listening = false;
        state.error = Some(message.to_string());
    }
}

/// Append a recognised utterance to the draft, space separated.
pub fn append_utterance(draft: &str, utterance: &str) -> String {
    if draft.is_empty() {
        utterance.to_string()
    } else {
        format!("{draft} {utterance}")
    }
}
