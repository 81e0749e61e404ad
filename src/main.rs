mod auth;
mod cli;
mod config;
mod error;
mod flakes;
mod logging;
mod output;
mod providers;
mod status;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_file().as_deref())?;

    output::print_banner();

    info!("Starting flake-tracker {}", env!("CARGO_PKG_VERSION"));
    cli.execute().await?;

    Ok(())
}
