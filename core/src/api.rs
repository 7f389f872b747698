use crate::auth::User;
use crate::config::ClientSettings;
use crate::session::SessionHandle;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

// Relative to the configured base url, which may carry a path prefix.
pub const LOGIN_PATH: &str = "api/login";
pub const REGISTER_PATH: &str = "api/register";
pub const PROFILE_PATH: &str = "api/profile";
pub const CHAT_SESSIONS_PATH: &str = "api/chat/sessions";
pub const CHAT_PATH: &str = "api/chat";

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("request rejected with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("session expired (status {status})")]
    Expired {
        status: u16,
        message: Option<String>,
    },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid endpoint path `{0}`")]
    InvalidPath(String),
    #[error("failed to persist credentials: {0}")]
    Storage(String),
}

impl ApiError {
    /// The message the backend itself reported, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } | Self::Expired { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text suitable for an inline error next to the form or transcript.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Rejected { status, message } => message.clone().unwrap_or_else(|| {
                StatusCode::from_u16(*status)
                    .ok()
                    .and_then(|status| status.canonical_reason())
                    .unwrap_or("Request failed")
                    .to_string()
            }),
            Self::Expired { message, .. } => message
                .clone()
                .unwrap_or_else(|| "Your session has expired. Please log in again.".to_string()),
            Self::Transport(_) => {
                "Network error occurred. Please check your internet connection.".to_string()
            }
            Self::Decode(_) | Self::InvalidPath(_) => {
                "The server sent an unexpected response.".to_string()
            }
            Self::Storage(_) => "Signed in, but the session could not be saved.".to_string(),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileResponse {
    Wrapped { user: User },
    Bare(User),
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    title: &'a str,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    #[serde(rename = "_id", alias = "id", alias = "sessionId")]
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    prompt: &'a str,
    session_id: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// The one HTTP client every backend call goes through.
///
/// Every request carries `Authorization: Bearer <token>` while a token is
/// held, and every 401/403 response ends the session before the error is
/// returned to the caller.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings, session: SessionHandle) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: directory_url(&settings.api_url),
            session,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.post(LOGIN_PATH, &LoginRequest { email, password })
            .await
    }

    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        self.post(
            REGISTER_PATH,
            &RegisterRequest {
                full_name,
                email,
                password,
            },
        )
        .await
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        let response: ProfileResponse = self.get(PROFILE_PATH).await?;
        Ok(match response {
            ProfileResponse::Wrapped { user } => user,
            ProfileResponse::Bare(user) => user,
        })
    }

    /// Start a backend conversation and return its identifier.
    pub async fn create_chat_session(&self, title: &str) -> Result<String, ApiError> {
        let response: CreateSessionResponse = self
            .post(CHAT_SESSIONS_PATH, &CreateSessionRequest { title })
            .await?;
        Ok(response.id)
    }

    pub async fn chat(&self, prompt: &str, session_id: &str) -> Result<String, ApiError> {
        let response: ChatResponse = self
            .post(CHAT_PATH, &ChatRequest { prompt, session_id })
            .await?;
        Ok(response.reply)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?;
        self.execute(request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path)?.json(body);
        self.execute(request).await
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ApiError::InvalidPath(path.to_string()))?;
        debug!(method = method.as_str(), url = url.as_str(), "backend request");
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.session.expire(status.as_u16());
            return Err(ApiError::Expired {
                status: status.as_u16(),
                message,
            });
        }
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// `https://host/backend` becomes `https://host/backend/`, so joining
/// `api/chat` keeps the prefix.
fn directory_url(base: &Url) -> Url {
    let mut url = base.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error
        .or(parsed.message)
        .filter(|message| !message.trim().is_empty())
}
