use crate::state::{Message, Sender};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedMessage {
    pub sender: Sender,
    pub content: String,
    /// RFC 3339 with millisecond precision, like `exportDate`.
    pub timestamp: String,
}

/// The downloadable JSON document produced from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptExport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub export_date: String,
    pub messages: Vec<ExportedMessage>,
}

impl TranscriptExport {
    pub fn build(user: Option<&str>, messages: &[Message], exported_at: DateTime<Utc>) -> Self {
        Self {
            user: user.map(str::to_owned),
            export_date: millis(exported_at),
            messages: messages
                .iter()
                .map(|message| ExportedMessage {
                    sender: message.sender,
                    content: message.content.clone(),
                    timestamp: millis(message.created_at),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document into `dir` and return the file path.
    pub fn write_to_dir(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        let path = dir.join(export_file_name(date));
        fs::write(&path, self.to_json()?)
            .with_context(|| format!("failed to write export to {}", path.display()))?;
        Ok(path)
    }
}

fn millis(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("chat-export-{}.json", date.format("%Y-%m-%d"))
}
