//! Demonstration server
//!
//! Hosts the simulated token streams (stand-ins for a model producing
//! output), a server-sent render stream that shows the host instructions a
//! stream produces, and the WebSocket relay.

mod error;
mod handlers;
mod relay;
mod state;
pub mod tokens;
mod upstream;

pub use error::ServerError;
pub use relay::RelayHub;
pub use state::AppState;
pub use upstream::UpstreamPolicy;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;

use crate::config::Config;

/// Build the router over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/simulated_token_stream", get(handlers::simulated_tokens))
        .route(
            "/simulated_with_tokenizer",
            get(handlers::simulated_with_tokenizer),
        )
        .route("/render/:key", get(handlers::render_stream))
        .route("/relay/:session/recv", get(relay::relay_recv))
        .route("/relay/:session/send", get(relay::relay_send))
        .with_state(state)
}

/// Start the server and run until `shutdown_rx` fires
pub async fn start_server(
    config: Config,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<()> {
    let bind_addr = config.bind_addr;
    let state = AppState::from_config(&config)?;
    if let Some(dev_server) = &state.dev_server {
        tracing::info!("Components served from dev server {}", dev_server);
    }

    let app = router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}
