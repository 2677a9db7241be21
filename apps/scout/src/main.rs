mod analysis;
mod cache;
mod cli;
mod config;
mod db;
mod dedup;
mod discovery;
mod errors;
mod llm_client;
mod models;
mod run;
mod sources;
mod state;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting job scout v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::build(config).await?;
    let output = cli::execute(cli.command.unwrap_or(Command::Run), &state).await?;

    // Output goes to stdout; logs stay on stderr.
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
