use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mockito::{Server, ServerGuard};
use parley_core::clipboard::MemoryClipboard;
use parley_core::telemetry::{self, LogTarget};
use parley_core::voice::Dictation;
use parley_core::{
    ApiClient, ClientSettings, FileCredentialStore, SendOutcome, SessionHandle, SessionStore,
    TranscriptController,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "xtask", version, about = "Automation helpers for Parley")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the client stack against an in-process mock backend.
    Smoke {
        /// Run only these checks.
        #[arg(long, value_enum)]
        only: Vec<Check>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Check {
    Login,
    Send,
    Rollback,
    Export,
}

const ALL_CHECKS: [Check; 4] = [Check::Login, Check::Send, Check::Rollback, Check::Export];

/// A mock backend plus a signed-out client stack pointed at it.
struct Rig {
    server: ServerGuard,
    sessions: SessionStore,
    api: ApiClient,
    dir: TempDir,
}

impl Rig {
    async fn start() -> Result<Self> {
        let server = Server::new_async().await;
        let dir = TempDir::new()?;
        let settings = ClientSettings::for_url(&server.url(), dir.path().to_path_buf())
            .map_err(|err| anyhow!(err.user_message()))?;
        let store = Arc::new(FileCredentialStore::new(settings.data_dir.clone()));
        let api = ApiClient::new(&settings, SessionHandle::new(store))?;
        let sessions = SessionStore::new(api.clone());
        Ok(Self {
            server,
            sessions,
            api,
            dir,
        })
    }

    async fn sign_in(&mut self) -> Result<()> {
        let user = json!({
            "_id": "smoke",
            "fullName": "Smoke Test",
            "email": "smoke@example.com",
        });
        self.server
            .mock("POST", "/api/login")
            .with_body(json!({ "token": "smoke-token", "user": user }).to_string())
            .create_async()
            .await;
        self.sessions
            .login("smoke@example.com", "smoke")
            .await
            .map_err(|err| anyhow!(err.user_message()))?;
        Ok(())
    }

    async fn answer_chats(&mut self, status: usize) {
        self.server
            .mock("POST", "/api/chat/sessions")
            .match_header("authorization", "Bearer smoke-token")
            .with_body(r#"{"_id":"smoke-session"}"#)
            .create_async()
            .await;
        self.server
            .mock("POST", "/api/chat")
            .match_header("authorization", "Bearer smoke-token")
            .with_status(status)
            .with_body(r#"{"reply":"pong"}"#)
            .create_async()
            .await;
    }

    fn controller(&self) -> TranscriptController {
        TranscriptController::new(
            self.api.clone(),
            Arc::new(MemoryClipboard::default()),
            Dictation::unsupported(),
        )
    }
}

async fn run_check(check: Check) -> Result<String> {
    let mut rig = Rig::start().await?;
    rig.sign_in().await?;
    match check {
        Check::Login => {
            let user = rig.sessions.user().ok_or_else(|| anyhow!("no user after login"))?;
            Ok(format!("signed in as {}", user.full_name))
        }
        Check::Send => {
            rig.answer_chats(200).await;
            match rig.controller().send_message("ping from xtask").await {
                SendOutcome::Delivered(reply) => Ok(format!("reply: {}", reply.content)),
                other => bail!("send did not deliver: {other:?}"),
            }
        }
        Check::Rollback => {
            rig.answer_chats(500).await;
            let chat = rig.controller();
            match chat.send_message("ping from xtask").await {
                SendOutcome::RolledBack(_) if chat.messages().is_empty() => {
                    Ok(format!("rolled back, draft {:?}", chat.draft()))
                }
                other => bail!("failed send was not rolled back: {other:?}"),
            }
        }
        Check::Export => {
            rig.answer_chats(200).await;
            let chat = rig.controller();
            chat.send_message("ping from xtask").await;
            let path = chat
                .export_to_dir(rig.dir.path())?
                .ok_or_else(|| anyhow!("nothing exported"))?;
            Ok(format!("wrote {}", path.display()))
        }
    }
}

fn smoke(only: Vec<Check>) -> Result<()> {
    let checks = if only.is_empty() {
        ALL_CHECKS.to_vec()
    } else {
        only
    };
    let runtime = Runtime::new()?;
    let mut failed = 0;
    for check in checks {
        match runtime.block_on(run_check(check)) {
            Ok(summary) => info!(?check, %summary, "smoke check passed"),
            Err(err) => {
                error!(?check, %err, "smoke check failed");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} smoke check(s) failed");
    }
    Ok(())
}

fn main() -> Result<()> {
    telemetry::init_tracing(EnvFilter::new("info"), LogTarget::Stderr)?;
    match Cli::parse().command {
        Commands::Smoke { only } => smoke(only),
    }
}
