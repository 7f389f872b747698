use crate::config::ShellSettings;
use anyhow::{anyhow, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use parley_core::{SessionStore, User};
use tracing::warn;

const MAX_LOGIN_ATTEMPTS: usize = 3;

/// Run a blocking terminal prompt off the async runtime.
async fn prompt<T, F>(ask: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&ColorfulTheme) -> dialoguer::Result<T> + Send + 'static,
{
    let answer = tokio::task::spawn_blocking(move || ask(&ColorfulTheme::default())).await??;
    Ok(answer)
}

pub async fn ask_email(default: Option<String>) -> Result<String> {
    prompt(move |theme| {
        let mut input = Input::<String>::with_theme(theme).with_prompt("Email");
        if let Some(default) = default {
            input = input.default(default);
        }
        input.interact_text()
    })
    .await
}

pub async fn ask_name() -> Result<String> {
    prompt(|theme| {
        Input::<String>::with_theme(theme)
            .with_prompt("Full name")
            .interact_text()
    })
    .await
}

/// Read a password without echoing it. `confirm` asks for it twice.
pub async fn ask_password(confirm: bool) -> Result<String> {
    prompt(move |theme| {
        let mut password = Password::with_theme(theme).with_prompt("Password");
        if confirm {
            password = password.with_confirmation("Repeat password", "Passwords do not match");
        }
        password.interact()
    })
    .await
}

/// Ask for credentials until a login succeeds, remembering the email.
pub async fn prompt_login(sessions: &SessionStore, settings: &mut ShellSettings) -> Result<User> {
    for _ in 0..MAX_LOGIN_ATTEMPTS {
        let email = ask_email(settings.last_email.clone()).await?;
        let password = ask_password(false).await?;
        match sessions.login(&email, &password).await {
            Ok(user) => {
                settings.last_email = Some(email.trim().to_string());
                return Ok(user);
            }
            Err(err) => {
                warn!(%err, "interactive login failed");
                eprintln!("{}", err.user_message());
            }
        }
    }
    Err(anyhow!("Too many failed sign-in attempts."))
}
