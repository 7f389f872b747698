pub mod api;
pub mod auth;
pub mod chat;
pub mod clipboard;
pub mod config;
pub mod export;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod templates;
pub mod voice;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionStore, User};
pub use chat::{SendOutcome, TranscriptController};
pub use config::ClientSettings;
pub use session::{SessionEvent, SessionHandle};
pub use state::{Message, Sender, Transcript, TranscriptStatus};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
