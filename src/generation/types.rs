// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Workflow data model and provider wire types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Extension used when the uploaded file carries none
pub const DEFAULT_EXTENSION: &str = "jpg";

/// ControlNet model used for reference-image generation
pub const DEFAULT_MODEL_ID: &str = "b24e16ff-06e3-43eb-8d33-4416c2d75876";

/// Canny edge preprocessor
pub const DEFAULT_PREPROCESSOR_ID: u32 = 133;

/// Normalize a file extension to lower-case without a leading dot
///
/// Empty input falls back to [`DEFAULT_EXTENSION`].
pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if trimmed.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        trimmed
    }
}

/// Form fields required by the presigned upload endpoint
///
/// The provider returns them either JSON-encoded inside a string or as a
/// plain object. Both are accepted and normalized with [`FormFields::to_map`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormFields {
    Encoded(String),
    Structured(BTreeMap<String, Value>),
}

impl FormFields {
    /// Normalize into a flat string→string mapping
    pub fn to_map(&self) -> Result<BTreeMap<String, String>, String> {
        let structured = match self {
            FormFields::Encoded(raw) => {
                serde_json::from_str::<BTreeMap<String, Value>>(raw)
                    .map_err(|e| format!("form fields are not a JSON object: {}", e))?
            }
            FormFields::Structured(map) => map.clone(),
        };

        Ok(structured
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect())
    }
}

impl From<BTreeMap<String, String>> for FormFields {
    fn from(map: BTreeMap<String, String>) -> Self {
        FormFields::Structured(
            map.into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        )
    }
}

/// One-time upload target for a single asset
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTarget {
    /// Opaque asset identifier used later as the ControlNet input
    pub asset_id: String,
    /// Presigned upload URL
    pub upload_url: String,
    /// Fields that must accompany the file in the multipart body
    pub form_fields: FormFields,
}

/// Remote generation job status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl GenerationStatus {
    /// Map a provider status string; unrecognised values count as pending
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPLETE" => GenerationStatus::Complete,
            "FAILED" => GenerationStatus::Failed,
            "RUNNING" => GenerationStatus::Running,
            _ => GenerationStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Complete | GenerationStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "PENDING",
            GenerationStatus::Running => "RUNNING",
            GenerationStatus::Complete => "COMPLETE",
            GenerationStatus::Failed => "FAILED",
        }
    }
}

/// Snapshot of a generation job as last reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub job_id: String,
    pub status: GenerationStatus,
    /// Ordered result URLs, empty until COMPLETE
    pub result_urls: Vec<String>,
    pub failure_reason: Option<String>,
}

impl GenerationJob {
    pub fn pending(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: GenerationStatus::Pending,
            result_urls: Vec::new(),
            failure_reason: None,
        }
    }
}

/// Fixed generation policy sent with every job
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    pub preprocessor_id: u32,
    pub strength_type: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            width: 512,
            height: 768,
            preprocessor_id: DEFAULT_PREPROCESSOR_ID,
            strength_type: "High".to_string(),
        }
    }
}

// --- Provider request/response types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload<'a> {
    pub height: u32,
    pub width: u32,
    pub model_id: &'a str,
    pub prompt: &'a str,
    pub controlnets: Vec<ControlNetInput<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlNetInput<'a> {
    pub init_image_id: &'a str,
    pub init_image_type: &'static str,
    pub preprocessor_id: u32,
    pub strength_type: &'a str,
}

impl<'a> GenerationPayload<'a> {
    pub fn new(params: &'a GenerationParams, asset_id: &'a str, prompt: &'a str) -> Self {
        Self {
            height: params.height,
            width: params.width,
            model_id: &params.model_id,
            prompt,
            controlnets: vec![ControlNetInput {
                init_image_id: asset_id,
                init_image_type: "UPLOADED",
                preprocessor_id: params.preprocessor_id,
                strength_type: &params.strength_type,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitImageResponse {
    pub upload_init_image: InitImageData,
}

#[derive(Debug, Deserialize)]
pub struct InitImageData {
    pub id: String,
    pub url: String,
    pub fields: FormFields,
}

impl From<InitImageData> for UploadTarget {
    fn from(data: InitImageData) -> Self {
        Self {
            asset_id: data.id,
            upload_url: data.url,
            form_fields: data.fields,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCreatedResponse {
    pub sd_generation_job: SdGenerationJob,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdGenerationJob {
    pub generation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerationStatusResponse {
    pub generations_by_pk: GenerationRecord,
}

#[derive(Debug, Deserialize)]
pub struct GenerationRecord {
    pub status: String,
    /// Absent or `null` until the job completes
    #[serde(default)]
    pub generated_images: Option<Vec<GeneratedImage>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}

impl GenerationRecord {
    pub fn into_job(self, job_id: &str) -> GenerationJob {
        GenerationJob {
            job_id: job_id.to_string(),
            status: GenerationStatus::from_provider(&self.status),
            result_urls: self
                .generated_images
                .unwrap_or_default()
                .into_iter()
                .map(|img| img.url)
                .collect(),
            failure_reason: self.message.filter(|m| !m.trim().is_empty()),
        }
    }
}
