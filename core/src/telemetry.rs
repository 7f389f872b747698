use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

pub const LOG_FILE: &str = "parley.log";

static SUBSCRIBER_GUARD: OnceLock<()> = OnceLock::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to `parley.log` in this directory. Used while the full-screen
    /// chat owns the terminal.
    File(PathBuf),
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_tracing(filter: EnvFilter, target: LogTarget) -> Result<()> {
    if SUBSCRIBER_GUARD.get().is_some() {
        return Ok(());
    }

    match target {
        LogTarget::Stderr => {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE)
                .build(&dir)
                .with_context(|| format!("failed to open {}", dir.join(LOG_FILE).display()))?;
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(appender));
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    SUBSCRIBER_GUARD.set(()).ok();

    Ok(())
}
