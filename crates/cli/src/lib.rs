pub mod api;
pub mod args;
pub mod commands;
pub mod error;
pub mod fleet;
pub mod loading;
pub mod menu;
pub mod notify;
pub mod session;
pub mod settings;
pub mod telemetry;
#[cfg(test)]
mod test_support;
pub mod transport;
pub mod view;

pub use api::ServerApi;
pub use args::*;
pub use commands::CommandContext;
pub use error::FleetError;
pub use fleet::FleetController;

use clap::Parser;

use crate::commands::machines::handle_machines;
use crate::commands::menu::handle_menu;
use crate::commands::token::handle_token;

/// Shared async entrypoint used by the binary.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_parsed(cli).await
}

/// Execute the CLI given a pre-parsed argument struct.
pub async fn run_parsed(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Menu { role } = cli.command {
        handle_menu(role);
        return Ok(());
    }

    // Precedence: CLI flags > env vars > config file > defaults.
    let settings = settings::load(cli.globals.config.as_deref())?.apply(cli.globals.overrides())?;
    tracing::debug!(server_url = %settings.server_url, "loaded settings");
    let ctx = CommandContext::new(settings)?;

    match cli.command {
        Commands::Machines { command } => handle_machines(&ctx, command).await?,
        Commands::Token { command } => handle_token(&ctx, command).await?,
        Commands::Menu { .. } => {}
    }

    Ok(())
}
