// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::api::AppState;
use crate::config::RelayConfig;
use crate::generation::{CompletionPoller, GenerationClient, GenerationService};
use crate::storage::TemporaryAsset;

/// Settings that override the environment configuration
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Provider REST base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Maximum number of status checks before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Seconds to wait between status checks
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(ref base) = self.api_base {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(attempts) = self.max_attempts {
            config.poll_policy.max_attempts = attempts;
        }
        if let Some(secs) = self.interval_secs {
            config.poll_policy.interval = Duration::from_secs(secs);
        }
    }
}

/// Arguments for generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Reference image to upload (left untouched; a temporary copy is sent)
    #[arg(long)]
    pub image: PathBuf,

    /// Text prompt describing the desired output
    #[arg(long)]
    pub prompt: String,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Arguments for status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Generation job identifier
    pub job_id: String,

    /// Keep polling until the job reaches a terminal state
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

fn load_config(overrides: &ConfigOverrides) -> Result<RelayConfig> {
    let mut config = RelayConfig::from_env().context("failed to load configuration")?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Run the full upload-and-generate workflow for a local image
pub async fn generate(args: GenerateArgs) -> Result<()> {
    let config = load_config(&args.overrides)?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;
    let asset = TemporaryAsset::copy_from(&config.upload_dir, &args.image)
        .await
        .with_context(|| format!("failed to read image {}", args.image.display()))?;
    info!("Staged {} as {}", args.image.display(), asset.path().display());

    let state = AppState::new(config)?;
    let urls = state.workflow.run(asset, &args.prompt).await?;

    for url in urls {
        println!("Generated image URL: {}", url);
    }
    Ok(())
}

/// Query (and optionally wait on) an existing generation job
pub async fn check_status(args: StatusArgs) -> Result<()> {
    let config = load_config(&args.overrides)?;
    let client = GenerationClient::new(&config)?;

    if args.wait {
        let poller = CompletionPoller::with_tokio(config.poll_policy);
        let urls = poller.wait_for_completion(&client, &args.job_id).await?;
        for url in urls {
            println!("Generated image URL: {}", url);
        }
        return Ok(());
    }

    let job = client.query_generation(&args.job_id).await?;
    println!("Generation {}: {}", job.job_id, job.status.as_str());
    if let Some(reason) = job.failure_reason {
        println!("Reason: {}", reason);
    }
    for url in job.result_urls {
        println!("Generated image URL: {}", url);
    }
    Ok(())
}
