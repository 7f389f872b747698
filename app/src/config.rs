use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const SETTINGS_FILE: &str = "shell_settings.json";

/// Preferences of the terminal shell, kept next to the credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellSettings {
    #[serde(default = "ShellSettings::default_show_templates")]
    pub show_templates_on_start: bool,
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            show_templates_on_start: ShellSettings::default_show_templates(),
            export_dir: None,
            last_email: None,
        }
    }
}

impl ShellSettings {
    fn default_show_templates() -> bool {
        true
    }

    /// Where exports land when no directory is given explicitly.
    pub fn export_dir_or_current(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub async fn load_shell_settings(data_dir: &Path) -> Result<ShellSettings> {
    let path = settings_path(data_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                let defaults = ShellSettings::default();
                save_shell_settings(data_dir, &defaults).await?;
                warn!(
                    error = ?err,
                    "failed to parse {SETTINGS_FILE}, resetting to defaults"
                );
                Ok(defaults)
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let defaults = ShellSettings::default();
            save_shell_settings(data_dir, &defaults).await?;
            Ok(defaults)
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {SETTINGS_FILE}")),
    }
}

pub async fn save_shell_settings(data_dir: &Path, settings: &ShellSettings) -> Result<()> {
    let path = settings_path(data_dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(settings)?;
    tokio::fs::write(&path, serialized)
        .await
        .with_context(|| format!("failed to write {SETTINGS_FILE} at {}", path.display()))
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}
