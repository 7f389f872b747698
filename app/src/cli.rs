use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Chat with a hosted AI assistant")]
pub struct Cli {
    /// Backend base url, overriding configuration.
    #[arg(long, global = true)]
    pub api_url: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Secrets are optional on the command line; anything missing is asked for
/// on the terminal without echo.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Sign in and remember the session.
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "PARLEY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "PARLEY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in account.
    Profile,
    /// Open the chat screen (the default).
    Chat,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Chat)
    }
}
