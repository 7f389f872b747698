use directories::BaseDirs;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Resolved settings for talking to the chat backend.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: Url,
    pub timeout: Duration,
    pub data_dir: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid API url `{0}`")]
    InvalidUrl(String),
    #[error("configuration invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUrl(url) => {
                format!("The API url `{url}` is not valid. Set PARLEY_API_URL or update parley.yaml.")
            }
            Self::Invalid(detail) => format!("Parley is misconfigured: {detail}."),
        }
    }
}

impl ClientSettings {
    /// Settings pointing at `api_url`, with defaults for everything else.
    pub fn for_url(api_url: &str, data_dir: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_url(api_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            data_dir,
        })
    }

    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_url(api_url.trim())?;
        Ok(self)
    }

    /// Load settings from `.env`, an optional `parley.yaml`, and the process
    /// environment, in increasing order of precedence.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let file = match locate_config_file() {
            Some(path) => {
                let contents = fs::read_to_string(&path).map_err(|err| {
                    ConfigError::Invalid(format!("failed to read {}: {err}", path.display()))
                })?;
                let parsed: ParleyConfig = serde_yaml::from_str(&contents)
                    .map_err(|err| ConfigError::Invalid(format!("invalid parley.yaml: {err}")))?;
                parsed.client.unwrap_or_default()
            }
            None => ClientSection::default(),
        };
        let env = EnvOverrides {
            api_url: std::env::var("PARLEY_API_URL").ok(),
            timeout_secs: std::env::var("PARLEY_TIMEOUT_SECS").ok(),
            data_dir: std::env::var("PARLEY_DATA_DIR").ok(),
        };
        resolve_settings(file, env)
    }
}

struct EnvOverrides {
    api_url: Option<String>,
    timeout_secs: Option<String>,
    data_dir: Option<String>,
}

fn resolve_settings(file: ClientSection, env: EnvOverrides) -> Result<ClientSettings, ConfigError> {
    let api_url = env
        .api_url
        .filter(|value| !value.trim().is_empty())
        .or(file.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let timeout_secs = match env.timeout_secs {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!("PARLEY_TIMEOUT_SECS must be a number, got `{raw}`"))
        })?,
        None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
    };
    if timeout_secs == 0 {
        return Err(ConfigError::Invalid("timeout must be at least one second".into()));
    }

    let data_dir = env
        .data_dir
        .map(PathBuf::from)
        .or(file.data_dir)
        .unwrap_or_else(default_data_dir);

    Ok(ClientSettings {
        api_url: parse_url(api_url.trim())?,
        timeout: Duration::from_secs(timeout_secs),
        data_dir,
    })
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

fn default_data_dir() -> PathBuf {
    match BaseDirs::new() {
        Some(base) => base.data_local_dir().join("parley"),
        None => PathBuf::from(".parley"),
    }
}

fn locate_config_file() -> Option<PathBuf> {
    parley_yaml_candidates()
        .into_iter()
        .find(|path| path.exists())
}

fn parley_yaml_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(base) = BaseDirs::new() {
        let config_dir = base.config_dir().join("parley");
        paths.push(config_dir.join("parley.yaml"));
        paths.push(config_dir.join("parley.yml"));
        let home_dir = base.home_dir();
        paths.push(home_dir.join(".parley").join("parley.yaml"));
        paths.push(home_dir.join(".parley").join("parley.yml"));
    } else {
        paths.push(PathBuf::from("parley.yaml"));
        paths.push(PathBuf::from("parley.yml"));
    }
    paths
}

#[derive(Debug, Deserialize)]
struct ParleyConfig {
    client: Option<ClientSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientSection {
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    data_dir: Option<PathBuf>,
}
