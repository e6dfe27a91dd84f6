mod auth;
mod cli;
mod config;
mod console;
mod error;
mod output;
mod poller;
mod server;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting consolefold - CI Console Folding Tool");
    cli.execute().await?;

    Ok(())
}
