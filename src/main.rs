mod auth;
mod catalog;
mod cli;
mod config;
mod correlate;
mod error;
mod logging;
mod output;
mod providers;
mod records;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_file())?;

    output::print_banner();

    info!("Starting testlens");
    cli.execute().await?;

    Ok(())
}
