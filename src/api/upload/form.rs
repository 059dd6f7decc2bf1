// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart body intake for the upload endpoint

use axum_extra::extract::Multipart;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::api::errors::ApiError;
use crate::storage::TemporaryAsset;

/// Multipart field carrying the reference image
pub const IMAGE_FIELD: &str = "image";

/// Multipart field carrying the text prompt
pub const PROMPT_FIELD: &str = "prompt";

/// Parts of an upload request the workflow cares about
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<TemporaryAsset>,
    pub prompt: Option<String>,
}

impl UploadForm {
    /// Prompt with surrounding whitespace removed, if any remains
    pub fn prompt_text(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Read the multipart body, streaming the image part into `upload_dir`
///
/// Unknown parts are skipped. An image part with no content (a browser form
/// submitted without choosing a file) counts as absent.
pub async fn read_upload_form(
    upload_dir: &Path,
    mut multipart: Multipart,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            IMAGE_FIELD => {
                let original_name = field.file_name().map(str::to_string);
                let (asset, mut file) =
                    TemporaryAsset::create(upload_dir, original_name.as_deref())
                        .await
                        .map_err(|e| {
                            ApiError::InternalError(format!("Failed to store upload: {}", e))
                        })?;

                let mut written: u64 = 0;
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Malformed multipart body: {}", e))
                })? {
                    file.write_all(&chunk).await.map_err(|e| {
                        ApiError::InternalError(format!("Failed to store upload: {}", e))
                    })?;
                    written += chunk.len() as u64;
                }
                file.flush()
                    .await
                    .map_err(|e| ApiError::InternalError(format!("Failed to store upload: {}", e)))?;

                if written == 0 {
                    debug!("Ignoring empty image part");
                    continue;
                }
                debug!(
                    "Image saved to: {} ({} bytes, original name {:?})",
                    asset.path().display(),
                    written,
                    original_name
                );
                form.image = Some(asset);
            }
            PROMPT_FIELD => {
                let text = field.text().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Malformed multipart body: {}", e))
                })?;
                form.prompt = Some(text);
            }
            other => debug!("Skipping unexpected multipart field {:?}", other),
        }
    }

    Ok(form)
}
