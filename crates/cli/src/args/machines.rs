use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::common::OutputFormatArgs;

#[derive(Debug, Subcommand)]
pub enum MachineCommands {
    /// List machines in the authorized or unauthorized view.
    List(MachineListArgs),
    /// Export a dump of a machine from the current listing.
    Dump(MachineDumpArgs),
}

#[derive(Debug, Clone, Args)]
pub struct MachineListArgs {
    /// Show machines awaiting authorization.
    #[arg(long)]
    pub unauthorized: bool,
    /// Maximum number of machines to return (1-100); defaults to page_size.
    #[arg(long)]
    pub limit: Option<u32>,
    /// Offset into the machine list for pagination.
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
    /// Free-text filter matched by the server.
    #[arg(long)]
    pub text: Option<String>,
    /// Output format for structured output (JSON/YAML); defaults to table.
    #[command(flatten)]
    pub output: OutputFormatArgs,
    /// Show authorization and error columns in table output.
    #[arg(long)]
    pub wide: bool,
}

#[derive(Debug, Clone, Args)]
pub struct MachineDumpArgs {
    /// Machine identifier.
    #[arg(long)]
    pub id: i64,
    /// Look the machine up in the unauthorized view.
    #[arg(long)]
    pub unauthorized: bool,
    /// Page size used to locate the machine (1-100); defaults to page_size.
    #[arg(long)]
    pub limit: Option<u32>,
    /// Offset of the page holding the machine.
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
    /// Free-text filter used to locate the machine.
    #[arg(long)]
    pub text: Option<String>,
    /// Directory the dump archive is written to (overrides dump_dir).
    #[arg(long = "out")]
    pub out: Option<PathBuf>,
}
