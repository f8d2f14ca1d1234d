#![cfg(not(tarpaulin_include))]

use clap::Parser;
use std::path::PathBuf;
use warehouse::app;
use warehouse::config::Config;

/// Browser front end for the warehouse handover and bundling sheets
#[derive(Parser, Debug)]
#[command(name = "warehouse-desk", version)]
struct Cli {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,

    /// Env file to load instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

/// Main entry point for the web application
///
/// Loads configuration from the environment, then serves the handover,
/// bundling and pending views until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.env_file.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    log::info!(
        "handover: {} / {:?}, bundling: {} / {:?}",
        config.handover.spreadsheet_id,
        config.handover.tab,
        config.bundling.spreadsheet_id,
        config.bundling.tab
    );
    app::run(config).await?;
    Ok(())
}
