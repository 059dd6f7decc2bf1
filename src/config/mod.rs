// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide relay configuration
//!
//! Loaded once at start-up and shared read-only (behind an `Arc`) by the
//! HTTP layer and the workflow. Business logic never reads the environment
//! directly; everything it needs is injected from here.
//!
//! ## Environment Variables
//!
//! - `API_KEY` (required): bearer credential for the generation provider
//! - `PORT` / `BIND_ADDR`: listen address (default `0.0.0.0:5000`)
//! - `API_BASE`: provider REST base URL
//! - `UPLOAD_DIR`: temporary storage for received images (default `uploads`)
//! - `REQUEST_TIMEOUT_SECS`: per-call HTTP timeout for provider calls
//! - `POLL_MAX_ATTEMPTS` / `POLL_INTERVAL_SECS`: completion polling bounds
//! - `MODEL_ID`, `IMAGE_WIDTH`, `IMAGE_HEIGHT`, `PREPROCESSOR_ID`,
//!   `STRENGTH_TYPE`: fixed generation policy

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::generation::{GenerationParams, PollPolicy};

pub const DEFAULT_API_BASE: &str = "https://cloud.leonardo.ai/api/rest/v1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub api_base: String,
    pub bind_addr: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub request_timeout: Duration,
    pub poll_policy: PollPolicy,
    pub generation: GenerationParams,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_policy: PollPolicy::default(),
            generation: GenerationParams::default(),
        }
    }
}

// API key stays out of logs
impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("upload_dir", &self.upload_dir)
            .field("request_timeout", &self.request_timeout)
            .field("poll_policy", &self.poll_policy)
            .field("generation", &self.generation)
            .finish()
    }
}

impl RelayConfig {
    /// Load configuration from the process environment (after `.env`)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset so that `KEY=` in a `.env` file
    /// falls back to the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let api_key = get("API_KEY").ok_or_else(|| anyhow!("API_KEY not found in environment"))?;

        let poll_policy = PollPolicy {
            max_attempts: parse_or(&get, "POLL_MAX_ATTEMPTS", defaults.poll_policy.max_attempts)?,
            interval: Duration::from_secs(parse_or(
                &get,
                "POLL_INTERVAL_SECS",
                defaults.poll_policy.interval.as_secs(),
            )?),
        };

        let generation = GenerationParams {
            model_id: get("MODEL_ID").unwrap_or(defaults.generation.model_id),
            width: parse_or(&get, "IMAGE_WIDTH", defaults.generation.width)?,
            height: parse_or(&get, "IMAGE_HEIGHT", defaults.generation.height)?,
            preprocessor_id: parse_or(&get, "PREPROCESSOR_ID", defaults.generation.preprocessor_id)?,
            strength_type: get("STRENGTH_TYPE").unwrap_or(defaults.generation.strength_type),
        };

        let config = Self {
            api_key,
            api_base: get("API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_or(&get, "PORT", defaults.port)?,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            poll_policy,
            generation,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the workflow cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow!("API_KEY must not be empty"));
        }
        if self.poll_policy.max_attempts == 0 {
            return Err(anyhow!("POLL_MAX_ATTEMPTS must be at least 1"));
        }
        if self.generation.width == 0 || self.generation.height == 0 {
            return Err(anyhow!(
                "image dimensions must be > 0, got {}x{}",
                self.generation.width,
                self.generation.height
            ));
        }
        Ok(())
    }

    /// Socket address the HTTP server binds to
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.bind_addr, self.port))
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("invalid value for {}: '{}' ({})", key, raw, e)),
        None => Ok(default),
    }
}
