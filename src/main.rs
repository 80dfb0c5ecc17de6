use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod commands;
mod config;
mod dashboard;
mod error;
mod market;
mod odds;
mod output;
mod store;
mod tracker;

use config::{Command, Config};
use output::OutputMode;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries tables / JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;
    debug!("Tracking sport {}", config.sport_key());

    let mode = OutputMode::from_json_flag(config.json);
    match &config.command {
        Command::Events => commands::events(&config, mode).await,
        Command::Scan { matchup, completed } => {
            commands::scan(&config, matchup, *completed, mode).await
        }
        Command::Show { matchup } => commands::show(&config, matchup.as_deref(), mode),
        Command::Serve => commands::serve(&config).await,
    }
}
