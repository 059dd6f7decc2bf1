// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generation provider client
//!
//! Wraps the four remote operations the workflow depends on behind the
//! [`GenerationService`] trait so the driver and poller can be exercised
//! against in-process fakes.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::error::WorkflowError;
use super::types::{
    normalize_extension, GenerationCreatedResponse, GenerationJob, GenerationParams,
    GenerationPayload, GenerationStatusResponse, InitImageResponse, UploadTarget,
};
use crate::config::RelayConfig;

/// Multipart field name the presigned endpoint expects the file under
pub const UPLOAD_FILE_FIELD: &str = "file";

/// Remote operations of the generation provider
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Request a one-time upload target for a file extension
    async fn acquire_upload_target(&self, extension: &str) -> Result<UploadTarget, WorkflowError>;

    /// Upload a local file to a previously acquired target
    async fn upload_asset(&self, target: &UploadTarget, path: &Path) -> Result<(), WorkflowError>;

    /// Submit a generation job conditioned on the uploaded asset
    ///
    /// Returns the provider's job identifier.
    async fn submit_generation(&self, asset_id: &str, prompt: &str)
        -> Result<String, WorkflowError>;

    /// Read the current state of a generation job once
    async fn query_generation(&self, job_id: &str) -> Result<GenerationJob, WorkflowError>;
}

/// HTTP client for the generation provider's REST API
pub struct GenerationClient {
    client: Client,
    upload_client: Client,
    api_base: String,
    api_key: String,
    params: GenerationParams,
}

impl GenerationClient {
    /// Create a new GenerationClient from the relay configuration
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        // Presigned uploads may be large; only the connect phase is bounded
        let upload_client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let api_base = config.api_base.trim_end_matches('/').to_string();
        info!(
            "Generation client configured: api_base={}, model={}",
            api_base, config.generation.model_id
        );

        Ok(Self {
            client,
            upload_client,
            api_base,
            api_key: config.api_key.clone(),
            params: config.generation.clone(),
        })
    }

    /// Get the configured API base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the fixed generation policy
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

/// Describe a non-2xx response as "upstream returned <status>: <body>"
async fn upstream_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("upstream returned {}: {}", status, body)
}

#[async_trait]
impl GenerationService for GenerationClient {
    async fn acquire_upload_target(&self, extension: &str) -> Result<UploadTarget, WorkflowError> {
        let extension = normalize_extension(extension);
        let url = self.endpoint("init-image");
        info!("Requesting presigned URL for extension: {}", extension);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "extension": extension }))
            .send()
            .await
            .map_err(|e| WorkflowError::UpstreamRequest(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkflowError::UpstreamRequest(
                upstream_failure(response).await,
            ));
        }

        let parsed: InitImageResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::UpstreamRequest(format!("malformed response: {}", e)))?;

        let target = UploadTarget::from(parsed.upload_init_image);
        debug!("Received presigned URL for asset {}", target.asset_id);
        Ok(target)
    }

    async fn upload_asset(&self, target: &UploadTarget, path: &Path) -> Result<(), WorkflowError> {
        let fields = target.form_fields.to_map().map_err(|message| WorkflowError::Upload {
            status: None,
            message,
        })?;

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| WorkflowError::Upload {
                status: None,
                message: format!("cannot open {}: {}", path.display(), e),
            })?;
        let length = file
            .metadata()
            .await
            .map_err(|e| WorkflowError::Upload {
                status: None,
                message: format!("cannot stat {}: {}", path.display(), e),
            })?
            .len();

        let mut form = Form::new();
        for (key, value) in fields {
            form = form.text(key, value);
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
            .file_name(file_name);
        // File must be the last part of a presigned POST
        form = form.part(UPLOAD_FILE_FIELD, part);

        info!("Uploading {} bytes to {}", length, target.upload_url);
        let response = self
            .upload_client
            .post(&target.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| WorkflowError::Upload {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Upload rejected: status={}, body={}", status, body);
            return Err(WorkflowError::Upload {
                status: Some(status.as_u16()),
                message: format!("upstream returned {}: {}", status, body),
            });
        }

        info!("Upload successful: {}", status);
        Ok(())
    }

    async fn submit_generation(
        &self,
        asset_id: &str,
        prompt: &str,
    ) -> Result<String, WorkflowError> {
        let payload = GenerationPayload::new(&self.params, asset_id, prompt);
        let url = self.endpoint("generations");
        debug!("Generation POST {} for asset {}", url, asset_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WorkflowError::GenerationRequest(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkflowError::GenerationRequest(
                upstream_failure(response).await,
            ));
        }

        let created: GenerationCreatedResponse = response.json().await.map_err(|e| {
            WorkflowError::GenerationRequest(format!("malformed response: {}", e))
        })?;

        let job_id = created.sd_generation_job.generation_id;
        info!("Generation initiated, ID: {}", job_id);
        Ok(job_id)
    }

    async fn query_generation(&self, job_id: &str) -> Result<GenerationJob, WorkflowError> {
        let url = self.endpoint(&format!("generations/{}", job_id));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| WorkflowError::Polling(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkflowError::Polling(upstream_failure(response).await));
        }

        let parsed: GenerationStatusResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::Polling(format!("malformed response: {}", e)))?;

        Ok(parsed.generations_by_pk.into_job(job_id))
    }
}
