// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload-and-generate endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::{debug, info, warn};

use super::form::read_upload_form;
use super::response::UploadResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /upload - Generate images from a reference image and a prompt
///
/// # Request
/// Multipart form with `image` (file) and `prompt` (text), both required.
///
/// # Response
/// - `images`: generated image URLs in provider order
///
/// # Errors
/// - 400 Bad Request: missing image or prompt (no provider call is made)
/// - 500 Internal Server Error: any provider or workflow failure, with the
///   triggering stage's message
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    debug!("Received upload request");

    let form = read_upload_form(&state.config.upload_dir, multipart).await?;

    // Image is checked first; a rejected request drops (and deletes) the file
    let prompt = form.prompt_text().map(str::to_string);
    let asset = form
        .image
        .ok_or_else(|| ApiError::InvalidRequest("No image file uploaded".to_string()))?;
    let prompt =
        prompt.ok_or_else(|| ApiError::InvalidRequest("No prompt provided".to_string()))?;
    info!(
        "Upload accepted: file={}, prompt_len={}",
        asset.path().display(),
        prompt.len()
    );

    // Detached so a client disconnect cannot cancel the workflow mid-stage
    let workflow = state.workflow.clone();
    let images = tokio::spawn(async move { workflow.run(asset, &prompt).await })
        .await
        .map_err(|e| {
            warn!("Workflow task aborted: {}", e);
            ApiError::InternalError(format!("Workflow task aborted: {}", e))
        })?
        .map_err(ApiError::from)?;

    info!("Returning {} generated image URL(s)", images.len());
    Ok(Json(UploadResponse { images }))
}
