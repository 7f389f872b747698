use crate::config::ShellSettings;
use crate::ui;
use parley_core::voice::VoiceToggle;
use parley_core::{Sender, SessionEvent, SessionStore, TranscriptController};
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Templates,
    Template(usize),
    Send,
    Copy(usize),
    Export(Option<PathBuf>),
    Voice,
    Dismiss,
    Profile,
    Logout,
    Quit,
    Message(String),
    Unknown(String),
}

impl ShellCommand {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Self::Message(line.to_string()));
        };
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());
        let command = match (name, arg) {
            ("help", _) => Self::Help,
            ("templates", _) => Self::Templates,
            ("template", Some(arg)) => match arg.parse() {
                Ok(number) => Self::Template(number),
                Err(_) => Self::Unknown(line.to_string()),
            },
            ("send", _) => Self::Send,
            ("copy", None) => Self::Copy(1),
            ("copy", Some(arg)) => match arg.parse() {
                Ok(number) if number > 0 => Self::Copy(number),
                _ => Self::Unknown(line.to_string()),
            },
            ("export", arg) => Self::Export(arg.map(PathBuf::from)),
            ("voice", _) => Self::Voice,
            ("dismiss", _) => Self::Dismiss,
            ("profile", _) => Self::Profile,
            ("logout", _) => Self::Logout,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        };
        Some(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    LoggedOut,
    Expired,
    Quit,
}

/// Runs chat commands against one transcript for the signed-in user.
pub struct ChatShell {
    sessions: SessionStore,
    chat: TranscriptController,
    settings: ShellSettings,
    events: broadcast::Receiver<SessionEvent>,
}

impl ChatShell {
    pub fn new(
        sessions: SessionStore,
        chat: TranscriptController,
        settings: ShellSettings,
    ) -> Self {
        let events = sessions.subscribe();
        Self {
            sessions,
            chat,
            settings,
            events,
        }
    }

    pub fn controller(&self) -> &TranscriptController {
        &self.chat
    }

    pub fn settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// Header for the transcript pane.
    pub fn title(&self) -> String {
        match self.sessions.user() {
            Some(user) => ui::render_welcome(&user),
            None => "AI Assistant".to_string(),
        }
    }

    /// Run one command and return notices for the user. Messages and the
    /// current error are read from the controller instead.
    pub async fn execute(&mut self, command: ShellCommand) -> (Flow, Vec<String>) {
        let mut output = Vec::new();
        let flow = match command {
            ShellCommand::Help => {
                output.push(ui::HELP.to_string());
                Flow::Continue
            }
            ShellCommand::Templates => {
                output.push(ui::render_templates());
                Flow::Continue
            }
            ShellCommand::Template(number) => {
                match self.chat.apply_template(number) {
                    Some(_) => output.push(format!("Template {number} is in the draft.")),
                    None => output.push(format!("There is no template {number}.")),
                }
                Flow::Continue
            }
            ShellCommand::Send => {
                self.chat.send_draft().await;
                Flow::Continue
            }
            ShellCommand::Message(text) => {
                self.chat.send_message(&text).await;
                Flow::Continue
            }
            ShellCommand::Copy(nth) => {
                self.copy_reply(nth, &mut output).await;
                Flow::Continue
            }
            ShellCommand::Export(dir) => {
                let dir = dir.unwrap_or_else(|| self.settings.export_dir_or_current());
                match self.chat.export_to_dir(&dir) {
                    Ok(Some(path)) => output.push(format!("Exported to {}", path.display())),
                    Ok(None) => output.push("Nothing to export yet.".to_string()),
                    Err(err) => output.push(format!("Export failed: {err}")),
                }
                Flow::Continue
            }
            ShellCommand::Voice => {
                match self.chat.toggle_voice().await {
                    VoiceToggle::Started => {
                        output.push("Listening... Ctrl+R or /voice again to stop.".to_string())
                    }
                    VoiceToggle::Stopped => output.push("Stopped listening.".to_string()),
                    VoiceToggle::Unsupported | VoiceToggle::Failed => {}
                }
                Flow::Continue
            }
            ShellCommand::Dismiss => {
                self.chat.dismiss_error();
                Flow::Continue
            }
            ShellCommand::Profile => {
                match self.sessions.user() {
                    Some(user) => output.push(ui::render_profile(&user)),
                    None => output.push("You are not signed in.".to_string()),
                }
                Flow::Continue
            }
            ShellCommand::Logout => {
                self.sessions.logout();
                output.push("Signed out.".to_string());
                Flow::LoggedOut
            }
            ShellCommand::Quit => Flow::Quit,
            ShellCommand::Unknown(line) => {
                output.push(format!("Unknown command `{line}`. Type /help."));
                Flow::Continue
            }
        };

        self.chat.poll_voice();
        if flow == Flow::Continue && self.session_expired() {
            output.push("Your session has expired. Please log in again.".to_string());
            return (Flow::Expired, output);
        }
        (flow, output)
    }

    async fn copy_reply(&self, nth: usize, output: &mut Vec<String>) {
        let reply = self
            .chat
            .messages()
            .into_iter()
            .rev()
            .filter(|message| message.sender == Sender::Assistant)
            .nth(nth.saturating_sub(1));
        match reply {
            Some(message) => match self.chat.copy_message(&message.content, message.id).await {
                Ok(()) => output.push("Copied the reply to the clipboard.".to_string()),
                Err(err) => output.push(format!("Copy failed: {err}")),
            },
            None => output.push("No reply to copy.".to_string()),
        }
    }

    fn session_expired(&mut self) -> bool {
        let mut expired = false;
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Expired { status }) => {
                    info!(status, "session expired while chatting");
                    expired = true;
                }
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        expired
    }
}
