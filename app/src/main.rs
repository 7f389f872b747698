use anyhow::{anyhow, Result};
use clap::Parser;
use parley::config::{load_shell_settings, save_shell_settings};
use parley::shell::{ChatShell, Flow};
use parley::{login, tui, ui, Cli, Command};
use parley_core::clipboard::{Clipboard, NoClipboard, SystemClipboard};
use parley_core::telemetry::{self, LogTarget};
use parley_core::voice::Dictation;
use parley_core::{
    ApiClient, ClientSettings, FileCredentialStore, SessionHandle, SessionStore,
    TranscriptController,
};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = Runtime::new()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = ClientSettings::load().map_err(|err| anyhow!(err.user_message()))?;
    if let Some(api_url) = &cli.api_url {
        settings = settings
            .with_api_url(api_url)
            .map_err(|err| anyhow!(err.user_message()))?;
    }

    // The chat screen owns the terminal, so its logs go to a file.
    let target = match cli.command() {
        Command::Chat => LogTarget::File(settings.data_dir.clone()),
        _ => LogTarget::Stderr,
    };
    telemetry::init_tracing(EnvFilter::from_default_env(), target)?;

    let credentials = Arc::new(FileCredentialStore::new(settings.data_dir.clone()));
    let session = SessionHandle::new(credentials);
    let api = ApiClient::new(&settings, session)?;
    let sessions = SessionStore::new(api.clone());
    sessions.restore().await;

    match cli.command() {
        Command::Login { email, password } => {
            let email = match email {
                Some(email) => email.clone(),
                None => login::ask_email(None).await?,
            };
            let password = match password {
                Some(password) => password.clone(),
                None => login::ask_password(false).await?,
            };
            let user = sessions
                .login(&email, &password)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Signed in as {} <{}>", user.full_name, user.email);
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let name = match name {
                Some(name) => name.clone(),
                None => login::ask_name().await?,
            };
            let email = match email {
                Some(email) => email.clone(),
                None => login::ask_email(None).await?,
            };
            let password = match password {
                Some(password) => password.clone(),
                None => login::ask_password(true).await?,
            };
            let user = sessions
                .register(&name, &email, &password)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Welcome, {}! Your account is ready.", user.full_name);
        }
        Command::Logout => {
            sessions.logout();
            println!("Signed out.");
        }
        Command::Profile => match sessions.user() {
            Some(user) => println!("{}", ui::render_profile(&user)),
            None => return Err(anyhow!("You are not signed in. Run `parley login`.")),
        },
        Command::Chat => chat(&settings, api, sessions).await?,
    }
    Ok(())
}

async fn chat(settings: &ClientSettings, api: ApiClient, sessions: SessionStore) -> Result<()> {
    let mut shell_settings = load_shell_settings(&settings.data_dir).await?;
    let clipboard: Arc<dyn Clipboard> = match SystemClipboard::start() {
        Ok(clipboard) => Arc::new(clipboard),
        Err(err) => {
            warn!(%err, "clipboard unavailable, copying is disabled");
            Arc::new(NoClipboard)
        }
    };
    tui::restore_terminal_on_panic();

    loop {
        if !sessions.is_authenticated() {
            println!("Please sign in to start chatting.");
            login::prompt_login(&sessions, &mut shell_settings).await?;
            save_shell_settings(&settings.data_dir, &shell_settings).await?;
        }

        // A new login always starts a fresh transcript.
        let controller =
            TranscriptController::new(api.clone(), clipboard.clone(), Dictation::unsupported());
        let mut shell = ChatShell::new(sessions.clone(), controller, shell_settings.clone());

        match tui::run(&mut shell).await? {
            Flow::Quit | Flow::Continue => break,
            Flow::LoggedOut => println!("Signed out."),
            Flow::Expired => println!("Your session has expired. Please log in again."),
        }
    }
    Ok(())
}
