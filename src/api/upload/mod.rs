// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload-and-generate API endpoint module
//!
//! Provides POST /upload: a reference image plus a prompt in, generated
//! image URLs out.

pub mod form;
pub mod handler;
pub mod response;

pub use form::{read_upload_form, UploadForm, IMAGE_FIELD, PROMPT_FIELD};
pub use handler::upload_handler;
pub use response::UploadResponse;
