use crate::auth::User;
use crate::store::{CredentialStore, PersistedCredentials};
use anyhow::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

const EVENT_CAPACITY: usize = 16;

/// Notifications about the authentication session.
///
/// `Expired` replaces a hidden global redirect: the HTTP client emits it on any
/// 401/403, and whichever shell is listening decides how to get the user back
/// to a login prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: String },
    LoggedOut,
    Expired { status: u16 },
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
}

/// Shared authentication state: the persisted credential, the cached token
/// and the current user.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionState>>,
    credentials: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        let token = match credentials.load() {
            Ok(persisted) => persisted.token.filter(|token| !token.is_empty()),
            Err(err) => {
                warn!(%err, "failed to load persisted credentials");
                None
            }
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(SessionState { token, user: None })),
            credentials,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().user.is_some()
    }

    pub fn persisted(&self) -> PersistedCredentials {
        self.credentials.load().unwrap_or_else(|err| {
            warn!(%err, "failed to load persisted credentials");
            PersistedCredentials::default()
        })
    }

    /// Persist a fresh token and replace the current user.
    pub fn establish(&self, token: String, user: User) -> Result<()> {
        self.credentials
            .save(&PersistedCredentials::logged_in(token.clone()))?;
        let user_id = user.id.clone();
        {
            let mut inner = self.inner.write();
            inner.token = Some(token);
            inner.user = Some(user);
        }
        info!(user_id = %user_id, "session established");
        self.events.send(SessionEvent::LoggedIn { user_id }).ok();
        Ok(())
    }

    /// Record the profile fetched for an already persisted token.
    pub fn restore_user(&self, user: User) {
        if let Some(token) = self.token() {
            if let Err(err) = self.credentials.save(&PersistedCredentials::logged_in(token)) {
                warn!(%err, "failed to refresh logged-in flag");
            }
        }
        let user_id = user.id.clone();
        self.inner.write().user = Some(user);
        self.events.send(SessionEvent::LoggedIn { user_id }).ok();
    }

    /// Drop token, flag and user. Never fails; storage errors are logged.
    pub fn clear(&self) {
        self.wipe();
        self.events.send(SessionEvent::LoggedOut).ok();
    }

    /// Forced logout after the backend rejected the credential.
    pub fn expire(&self, status: u16) {
        warn!(status, "backend rejected credentials, ending session");
        self.wipe();
        self.events.send(SessionEvent::Expired { status }).ok();
    }

    fn wipe(&self) {
        if let Err(err) = self.credentials.clear() {
            warn!(%err, "failed to clear persisted credentials");
        }
        let mut inner = self.inner.write();
        inner.token = None;
        inner.user = None;
    }
}
