//! tidyts CLI - tidy time series from wide dated-column tables and incident logs.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "tidyts-cli",
    version,
    about = "Reshape, join, aggregate and smooth dated count tables"
)]
struct Cli {
    #[command(subcommand)]
    command: tidyts_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("tidyts-cli {}", env!("CARGO_PKG_VERSION"));
    tidyts_cmd::run(cli.command)
}
