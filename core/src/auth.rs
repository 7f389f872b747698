use crate::api::{ApiClient, ApiError, AuthResponse};
use crate::session::{SessionEvent, SessionHandle};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// The signed-in account as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Up to two upper-cased initials for compact headers.
    pub fn initials(&self) -> String {
        let initials: String = self
            .full_name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect();
        if !initials.is_empty() {
            return initials;
        }
        self.email
            .chars()
            .next()
            .map(|ch| ch.to_uppercase().collect())
            .unwrap_or_default()
    }

    pub fn last_login_display(&self) -> Option<String> {
        self.last_login
            .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
    }
}

/// Login state for the whole client.
///
/// Every mutation goes through `login`, `register`, `logout` and `restore`;
/// a 401/403 seen by the [`ApiClient`] ends the session from underneath and
/// shows up as [`SessionEvent::Expired`].
#[derive(Clone)]
pub struct SessionStore {
    api: ApiClient,
    loading: Arc<RwLock<bool>>,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            loading: Arc::new(RwLock::new(true)),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn session(&self) -> &SessionHandle {
        self.api.session()
    }

    pub fn user(&self) -> Option<User> {
        self.session().user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    /// True until the initial `restore` has finished.
    pub fn is_loading(&self) -> bool {
        *self.loading.read()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session().subscribe()
    }

    /// Re-establish a session from persisted credentials.
    ///
    /// Only attempted when both the token and the logged-in flag are stored.
    /// A failed profile fetch discards the credential; there is no retry.
    pub async fn restore(&self) -> Option<User> {
        let persisted = self.session().persisted();
        let result = match persisted.restorable_token() {
            Some(_) => match self.api.profile().await {
                Ok(user) => {
                    info!(user_id = %user.id, "restored session");
                    self.session().restore_user(user.clone());
                    Some(user)
                }
                Err(err) => {
                    warn!(%err, "stored credentials rejected, discarding them");
                    if !err.is_expired() {
                        self.session().clear();
                    }
                    None
                }
            },
            None => None,
        };
        *self.loading.write() = false;
        result
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "Please enter your email and password.".to_string(),
            ));
        }
        let response = self.api.login(email, password).await?;
        self.accept(response)
    }

    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let full_name = full_name.trim();
        let email = email.trim();
        if full_name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "Please fill in your name, email and password.".to_string(),
            ));
        }
        let response = self.api.register(full_name, email, password).await?;
        self.accept(response)
    }

    pub fn logout(&self) {
        info!("logging out");
        self.session().clear();
    }

    fn accept(&self, response: AuthResponse) -> Result<User, ApiError> {
        let AuthResponse { token, user } = response;
        self.session()
            .establish(token, user.clone())
            .map_err(|err| ApiError::Storage(err.to_string()))?;
        Ok(user)
    }
}
