// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Reference-image generation via a presigned-upload provider workflow

pub mod client;
pub mod error;
pub mod poller;
pub mod types;
pub mod workflow;

pub use client::{GenerationClient, GenerationService, UPLOAD_FILE_FIELD};
pub use error::WorkflowError;
pub use poller::{CompletionPoller, PollPolicy, Sleeper, TokioSleeper};
pub use types::{
    normalize_extension, FormFields, GenerationJob, GenerationParams, GenerationStatus,
    UploadTarget, DEFAULT_EXTENSION, DEFAULT_MODEL_ID, DEFAULT_PREPROCESSOR_ID,
};
pub use workflow::WorkflowDriver;
