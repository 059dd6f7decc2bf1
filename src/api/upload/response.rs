// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload endpoint response types

use serde::{Deserialize, Serialize};

/// Successful upload-and-generate response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    /// Generated image URLs, in provider order
    pub images: Vec<String>,
}
