// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the generation workflow
//!
//! Every variant is terminal for the request. The display string names the
//! stage that failed and carries the upstream payload or transport message,
//! and is what the HTTP boundary returns to the caller.

use thiserror::Error;

/// Errors that can occur while running the generation workflow
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    /// Missing or empty input; no remote call was made
    #[error("{0}")]
    Validation(String),

    /// Upload credentials could not be obtained
    #[error("Error obtaining presigned URL: {0}")]
    UpstreamRequest(String),

    /// Pushing the image to the presigned target failed
    #[error("Error uploading image: {message}")]
    Upload {
        /// Upstream HTTP status when a response was received
        status: Option<u16>,
        message: String,
    },

    /// The generation job could not be created
    #[error("Error generating image: {0}")]
    GenerationRequest(String),

    /// A status query failed at the transport or decode level
    #[error("Error retrieving generated images: {0}")]
    Polling(String),

    /// The provider reported the job as failed
    #[error("Generation failed: {reason}")]
    GenerationFailed { reason: String },

    /// The job did not reach a terminal state within the attempt budget
    #[error("Timed out waiting for image generation to complete after {attempts} attempts")]
    GenerationTimeout { attempts: u32 },
}

impl WorkflowError {
    /// Workflow stage the error originated from, for logging
    pub fn stage(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "validation",
            WorkflowError::UpstreamRequest(_) => "acquire_upload_target",
            WorkflowError::Upload { .. } => "upload_asset",
            WorkflowError::GenerationRequest(_) => "submit_generation",
            WorkflowError::Polling(_)
            | WorkflowError::GenerationFailed { .. }
            | WorkflowError::GenerationTimeout { .. } => "poll_completion",
        }
    }

    /// Whether the caller supplied bad input (as opposed to an upstream fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, WorkflowError::Validation(_))
    }
}
