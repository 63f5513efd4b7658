use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::session::Role;
use crate::settings::SettingsOverrides;

pub mod common;
pub mod machines;

pub use common::*;
pub use machines::*;

#[derive(Debug, Parser)]
#[command(
    name = "fleetview",
    version,
    about = "fleetview - machine fleet inventory console"
)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags. Unset flags fall back to `FLEETVIEW_*` variables, then
/// `fleetview.toml`, then built-in defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Path to a TOML config file (default: ./fleetview.toml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL, e.g. http://127.0.0.1:8080
    #[arg(long, global = true)]
    pub server_url: Option<String>,

    /// Session token sent as a bearer credential.
    #[arg(long = "session-token", visible_alias = "token", global = true)]
    pub session_token: Option<String>,

    /// Header name used for the session token (default: authorization).
    #[arg(long = "session-header", global = true)]
    pub session_header: Option<String>,

    /// Default page size for listings (1-100).
    #[arg(long, global = true)]
    pub page_size: Option<u32>,
}

impl GlobalArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            server_url: self.server_url.clone(),
            session_header: self.session_header.clone(),
            session_token: self.session_token.clone(),
            page_size: self.page_size,
            dump_dir: None,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Machine inventory commands.
    Machines {
        #[command(subcommand)]
        command: MachineCommands,
    },
    /// Agent installation token commands.
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Print the navigation menu available to a role.
    Menu {
        /// Role of the signed-in user; omit for an anonymous session.
        #[arg(long, value_enum)]
        role: Option<Role>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TokenCommands {
    /// Print the agent installation instruction with the current token.
    Show,
    /// Rotate the token and print the new instruction.
    Regenerate,
}
