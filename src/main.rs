// markstream - streaming display controller
//
// The binary hosts the demonstration server and a render command that
// prints host instructions as JSON lines.
//
// Architecture:
// - Server (axum): simulated token streams, SSE render stream, socket relay
// - Controller (library): identity resolution, accumulation, dispatch
// - Config: ~/.config/markstream/config.toml with env overrides

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use markstream::config::Config;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Config commands run before logging is set up
    if let Some(action) = cli::config_action(&cli) {
        return cli::run_config(action);
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();
    let mut config = Config::load()
        .context("Fix the file or run `markstream config --reset` to restore defaults")?;

    // The guard must outlive every log call so buffered lines get flushed
    let _file_guard = markstream::logging::init(&config.logging);
    for warning in &config.warnings {
        tracing::warn!("Config: {}", warning);
    }

    match cli.command {
        Some(cli::Commands::Render(args)) => cli::run_render(&config, args).await,
        Some(cli::Commands::Serve { bind }) => {
            if let Some(bind) = bind {
                config.bind_addr = bind
                    .parse::<SocketAddr>()
                    .map_err(|e| anyhow::anyhow!("Invalid bind address {:?}: {}", bind, e))?;
            }
            serve(config).await
        }
        Some(cli::Commands::Config { .. }) | None => serve(config).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut server = tokio::spawn(markstream::server::start_server(config, shutdown_rx));

    // A server that fails to start ends the process right away
    tokio::select! {
        result = &mut server => return result?,
        signal = tokio::signal::ctrl_c() => signal?,
    }
    tracing::info!("Shutting down...");

    // If the send fails, the server has already stopped
    let _ = shutdown_tx.send(());
    server.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
