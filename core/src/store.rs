use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const CREDENTIALS_FILE: &str = "credentials.json";

/// What survives between runs: the bearer token and the "was logged in" flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCredentials {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "isLogging")]
    pub logged_in: bool,
}

impl PersistedCredentials {
    pub fn logged_in(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            logged_in: true,
        }
    }

    /// Both halves must be present before a restore is attempted.
    pub fn restorable_token(&self) -> Option<&str> {
        match (&self.token, self.logged_in) {
            (Some(token), true) if !token.is_empty() => Some(token.as_str()),
            _ => None,
        }
    }
}

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<PersistedCredentials>;
    fn save(&self, credentials: &PersistedCredentials) -> Result<()>;
    /// Removes token and flag together.
    fn clear(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    pub fn new(root: PathBuf) -> Self {
        fs::create_dir_all(&root).ok();
        Self { root }
    }

    pub fn temporary() -> Self {
        let mut path = std::env::temp_dir();
        path.push(format!("parley-{}", Uuid::new_v4()));
        Self::new(path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn credentials_path(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<PersistedCredentials> {
        let path = self.credentials_path();
        if !path.exists() {
            return Ok(PersistedCredentials::default());
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(credentials) => Ok(credentials),
            Err(err) => {
                tracing::warn!(%err, "discarding unreadable credentials file");
                Ok(PersistedCredentials::default())
            }
        }
    }

    fn save(&self, credentials: &PersistedCredentials) -> Result<()> {
        let path = self.credentials_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let serialized = serde_json::to_vec_pretty(credentials)?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(self.credentials_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("failed to remove credentials file"),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<PersistedCredentials>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: PersistedCredentials) -> Self {
        Self {
            inner: Mutex::new(credentials),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<PersistedCredentials> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, credentials: &PersistedCredentials) -> Result<()> {
        *self.inner.lock() = credentials.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock() = PersistedCredentials::default();
        Ok(())
    }
}
