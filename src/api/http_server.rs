// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::upload::upload_handler;
use crate::config::RelayConfig;
use crate::generation::{CompletionPoller, GenerationClient, GenerationService, WorkflowDriver};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub workflow: Arc<WorkflowDriver>,
}

impl AppState {
    /// Wire the real provider client and tokio-timed poller from config
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client: Arc<dyn GenerationService> = Arc::new(GenerationClient::new(&config)?);
        let poller = CompletionPoller::with_tokio(config.poll_policy);
        let workflow = WorkflowDriver::new(client, poller);
        Ok(Self::with_workflow(config, workflow))
    }

    /// Build state around an already-assembled workflow
    pub fn with_workflow(config: RelayConfig, workflow: WorkflowDriver) -> Self {
        Self {
            config: Arc::new(config),
            workflow: Arc::new(workflow),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Upload-and-generate endpoint
        .route("/upload", post(upload_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until ctrl-c
pub async fn start_server(state: AppState) -> Result<()> {
    let upload_dir = state.config.upload_dir.clone();
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("failed to create upload dir {}", upload_dir.display()))?;

    let addr = state.config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::version::get_version_info(),
    }))
}
