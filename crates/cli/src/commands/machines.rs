use common::api::Machine;

use crate::args::{MachineCommands, MachineDumpArgs, MachineListArgs, OutputMode};
use crate::commands::CommandContext;
use crate::fleet::ControllerConfig;
use crate::view::machines::render_listing;
use crate::view::{to_pretty_json, to_pretty_yaml};

pub async fn handle_machines(ctx: &CommandContext, command: MachineCommands) -> anyhow::Result<()> {
    match command {
        MachineCommands::List(args) => list_machines(ctx, args).await,
        MachineCommands::Dump(args) => dump_machine(ctx, args).await,
    }
}

async fn list_machines(ctx: &CommandContext, args: MachineListArgs) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(ctx.settings.page_size);
    let mut fleet = ctx.fleet(
        ControllerConfig {
            page_size: limit,
            text_filter: args.text.clone(),
        },
        None,
    )?;
    let controller = &fleet.controller;
    controller.set_view(!args.unauthorized).await;
    if args.offset > 0 {
        controller.set_page(args.offset, limit).await;
    }
    fleet.finish()?;

    let controller = &fleet.controller;
    let state = controller.machines_snapshot();
    match args.output.mode() {
        OutputMode::Json => println!("{}", to_pretty_json(&state)?),
        OutputMode::Yaml => print!("{}", to_pretty_yaml(&state)?),
        OutputMode::Table => println!(
            "{}",
            render_listing(
                &state,
                &controller.view_options(),
                controller.active_view(),
                args.wide
            )
        ),
    }
    Ok(())
}

async fn dump_machine(ctx: &CommandContext, args: MachineDumpArgs) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(ctx.settings.page_size);
    let mut fleet = ctx.fleet(
        ControllerConfig {
            page_size: limit,
            text_filter: args.text.clone(),
        },
        args.out.clone(),
    )?;
    fleet.controller.set_view(!args.unauthorized).await;
    if args.offset > 0 {
        fleet.controller.set_page(args.offset, limit).await;
    }
    fleet.finish()?;

    let machine = fleet
        .controller
        .machines_snapshot()
        .find(args.id)
        .cloned()
        .unwrap_or_else(|| Machine {
            id: args.id,
            ..Machine::default()
        });
    let stored = fleet.controller.download_dump(&machine).await;
    fleet.finish()?;
    if let Some(path) = stored {
        println!("dump saved to {}", path.display());
    }
    Ok(())
}
