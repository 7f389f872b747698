pub mod cli;
pub mod config;
pub mod events;
pub mod login;
pub mod shell;
pub mod tui;
pub mod ui;

pub use cli::{Cli, Command};
pub use config::{load_shell_settings, save_shell_settings, ShellSettings};
pub use shell::{ChatShell, ShellCommand};
pub use tui::ChatView;
