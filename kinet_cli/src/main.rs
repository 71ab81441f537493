use anyhow::Result;
use clap::Parser;

mod commands;
mod config;
mod render;
mod shell;
mod telemetry;

use commands::{Command, Context};
use config::CliConfig;

#[derive(Parser)]
#[command(author, version, about = "Command-line client for the Kinet social network")]
struct Args {
    /// API base URL; overrides the config file and KINET_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();

    let mut config = CliConfig::load()?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    tracing::debug!(api_url = %config.api_url, "configuration loaded");

    let mut ctx = Context::new(config)?;
    match args.command.unwrap_or(Command::Shell) {
        Command::Shell => shell::run_shell(&mut ctx),
        command => commands::run(&mut ctx, command),
    }
}
