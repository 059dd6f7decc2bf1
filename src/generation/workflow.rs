// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload-and-generate workflow driver

use std::sync::Arc;
use tracing::{error, info};

use super::client::GenerationService;
use super::error::WorkflowError;
use super::poller::CompletionPoller;
use crate::storage::TemporaryAsset;

/// Sequences the provider calls for one request and owns its temp file
///
/// Pipeline:
/// 1. Validate the asset and prompt (no remote calls on failure)
/// 2. Acquire an upload target for the asset's extension
/// 3. Upload the local file
/// 4. Release the local file
/// 5. Submit the generation job
/// 6. Poll until the job completes
/// 7. Return the result URLs
///
/// Any failure in 2-6 releases the file if it is still held and surfaces a
/// single [`WorkflowError`].
#[derive(Clone)]
pub struct WorkflowDriver {
    service: Arc<dyn GenerationService>,
    poller: CompletionPoller,
}

impl WorkflowDriver {
    pub fn new(service: Arc<dyn GenerationService>, poller: CompletionPoller) -> Self {
        Self { service, poller }
    }

    pub fn poller(&self) -> &CompletionPoller {
        &self.poller
    }

    /// Run the full workflow for one uploaded image
    pub async fn run(
        &self,
        mut asset: TemporaryAsset,
        prompt: &str,
    ) -> Result<Vec<String>, WorkflowError> {
        let result = self.execute(&mut asset, prompt).await;

        if let Err(ref e) = result {
            error!("Workflow failed at {}: {}", e.stage(), e);
            if !asset.is_released() {
                info!("Cleaning up temporary file after error");
            }
        }
        asset.release_async().await;

        result
    }

    async fn execute(
        &self,
        asset: &mut TemporaryAsset,
        prompt: &str,
    ) -> Result<Vec<String>, WorkflowError> {
        validate_inputs(asset, prompt).await?;

        info!(
            "Getting presigned URL for extension: {}",
            asset.extension()
        );
        let target = self
            .service
            .acquire_upload_target(asset.extension())
            .await?;
        info!("Received presigned URL and image ID: {}", target.asset_id);

        self.service.upload_asset(&target, asset.path()).await?;
        info!("Image uploaded successfully");

        asset.release_async().await;

        let job_id = self
            .service
            .submit_generation(&target.asset_id, prompt)
            .await?;

        let urls = self
            .poller
            .wait_for_completion(self.service.as_ref(), &job_id)
            .await?;
        info!("Retrieved {} generated image URL(s)", urls.len());

        Ok(urls)
    }
}

async fn validate_inputs(asset: &TemporaryAsset, prompt: &str) -> Result<(), WorkflowError> {
    if asset.path().as_os_str().is_empty() || asset.is_released() {
        return Err(WorkflowError::Validation(
            "No image file uploaded".to_string(),
        ));
    }
    if prompt.trim().is_empty() {
        return Err(WorkflowError::Validation("No prompt provided".to_string()));
    }
    match tokio::fs::metadata(asset.path()).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(WorkflowError::Validation(format!(
            "Image file is not readable: {}",
            asset.path().display()
        ))),
    }
}
