use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use hk_api::Client;
use tracing_subscriber::EnvFilter;

use hk_mcp::{Cli, Commands, Config, ToolServer, tools};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support. Stdout carries the
    // JSON-RPC stream, so logs go to stderr.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Tools) => {
            // Listing tools doesn't need a token
            println!("{}", serde_json::to_string_pretty(&tools::catalog())?);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Serve) | None => serve(&cli).await,
    }
}

async fn serve(cli: &Cli) -> Result<ExitCode> {
    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if config.token().is_none() {
        eprintln!("Missing HAKUNA_TOKEN environment variable.");
        return Ok(ExitCode::FAILURE);
    }

    let client = Client::new(config.client_config()).context("failed to build API client")?;
    let server = ToolServer::new(client);
    tracing::info!(base_url = %config.base_url, "serving tools on stdio");
    server
        .serve_stdio()
        .await
        .context("failed to serve stdio")?;
    Ok(ExitCode::SUCCESS)
}
