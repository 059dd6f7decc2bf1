// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use controlnet_relay::{api::start_server, version, AppState, RelayConfig};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting {}", version::get_version_string());

    let config = RelayConfig::from_env().context("failed to load configuration")?;
    info!("Configuration loaded: {:?}", config);

    let state = AppState::new(config).context("failed to initialise generation client")?;
    start_server(state).await
}
