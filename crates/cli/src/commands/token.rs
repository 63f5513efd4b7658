use crate::args::TokenCommands;
use crate::commands::CommandContext;
use crate::fleet::ControllerConfig;
use crate::view::token::render_installation_instruction;

pub async fn handle_token(ctx: &CommandContext, command: TokenCommands) -> anyhow::Result<()> {
    let mut fleet = ctx.fleet(ControllerConfig::default(), None)?;
    fleet.controller.show_token().await;
    fleet.finish()?;
    if matches!(command, TokenCommands::Regenerate) {
        fleet.controller.regenerate_token().await;
        fleet.finish()?;
    }

    let state = fleet.controller.token_snapshot();
    println!(
        "{}",
        render_installation_instruction(&state, &ctx.settings.server_url)
    );
    fleet.controller.close_token();
    Ok(())
}
