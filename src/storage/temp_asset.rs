// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scoped temporary image file
//!
//! A [`TemporaryAsset`] owns one uniquely named file in the upload directory
//! for the duration of a single request. The file is removed at most once:
//! either explicitly through [`TemporaryAsset::release`] or, on any exit
//! path that skipped it, when the guard is dropped. Removing a file that is
//! already gone is a no-op, and a failed removal is logged but never
//! propagated.

use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::generation::types::normalize_extension;

/// Extension of an uploaded file's original name, normalized
///
/// `photo.PNG` gives `png`; `photo` gives the default `jpg`.
pub fn extension_from_filename(name: &str) -> String {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize_extension(&ext)
}

/// Collision-free file name: `<unix-millis>-<uuid>.<ext>`
pub fn unique_file_name(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        normalize_extension(extension)
    )
}

#[derive(Debug)]
pub struct TemporaryAsset {
    path: PathBuf,
    extension: String,
    released: bool,
}

impl TemporaryAsset {
    /// Take ownership of an existing file
    pub fn new(path: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            path: path.into(),
            extension: normalize_extension(extension),
            released: false,
        }
    }

    /// Create a new empty, uniquely named file in `dir`
    ///
    /// The extension is derived from the client's original file name.
    /// Returns the guard together with an open handle for writing.
    pub async fn create(dir: &Path, original_name: Option<&str>) -> io::Result<(Self, File)> {
        let extension = extension_from_filename(original_name.unwrap_or_default());
        let path = dir.join(unique_file_name(&extension));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        debug!("Temporary file created: {}", path.display());
        Ok((Self::new(path, &extension), file))
    }

    /// Copy `source` into `dir` as a new temporary asset
    ///
    /// The source file itself is never touched by the workflow.
    pub async fn copy_from(dir: &Path, source: &Path) -> io::Result<Self> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (asset, file) = Self::create(dir, Some(&name)).await?;
        drop(file);
        tokio::fs::copy(source, asset.path()).await?;
        Ok(asset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Delete the file if this guard still holds it
    ///
    /// Only the first call attempts removal. Returns `true` when a file was
    /// actually deleted. Blocking; used by `Drop`.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        let result = std::fs::remove_file(&self.path);
        self.removal_outcome(result)
    }

    /// Async counterpart of [`release`](Self::release) for use on the runtime
    pub async fn release_async(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        let result = tokio::fs::remove_file(&self.path).await;
        self.removal_outcome(result)
    }

    fn removal_outcome(&self, result: io::Result<()>) -> bool {
        match result {
            Ok(()) => {
                info!("Temporary file deleted: {}", self.path.display());
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Temporary file already gone: {}", self.path.display());
                false
            }
            Err(e) => {
                warn!("Error deleting file {}: {}", self.path.display(), e);
                false
            }
        }
    }
}

impl Drop for TemporaryAsset {
    fn drop(&mut self) {
        self.release();
    }
}
