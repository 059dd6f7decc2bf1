// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local temporary storage for received images

pub mod temp_asset;

// Re-export main types for convenience
pub use temp_asset::{extension_from_filename, unique_file_name, TemporaryAsset};
