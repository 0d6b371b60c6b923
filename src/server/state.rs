//! Shared server state

use anyhow::{Context, Result};

use super::relay::RelayHub;
use super::upstream::UpstreamPolicy;
use crate::config::{Config, RenderConfig, SimulationConfig};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Client for remote fragment sources
    pub client: reqwest::Client,
    pub render: RenderConfig,
    pub simulation: SimulationConfig,
    pub dev_server: Option<String>,
    /// Remote sources `/render` may fetch
    pub upstreams: UpstreamPolicy,
    pub relay: RelayHub,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            render: config.render.clone(),
            simulation: config.simulation.clone(),
            dev_server: config.dev_server.clone(),
            upstreams: UpstreamPolicy::new(&config.allowed_upstreams, config.bind_addr),
            relay: RelayHub::new(),
        })
    }
}
