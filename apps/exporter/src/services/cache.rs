// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk cache of STL payloads using cacache.
//!
//! Only microversion references are cached: a microversion is an immutable
//! snapshot, so its tessellation never changes.

use crate::config::StlExportOptions;
use crate::error::ExportError;
use onshape_lite_core::{PartInfo, VersionKind};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Content-addressable disk cache.
#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
}

impl DiskCache {
    /// Create a new cache in the specified directory.
    pub async fn new(cache_dir: &Path) -> Self {
        let path = cache_dir.to_path_buf();

        // Create cache directory if it doesn't exist
        if let Err(e) = tokio::fs::create_dir_all(&path).await {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Failed to create cache directory"
            );
        }

        Self { cache_dir: path }
    }

    /// SHA256 of a payload, hex encoded.
    pub fn digest(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Cache key of a part's STL, or `None` if the reference is mutable.
    pub fn stl_key(part: &PartInfo, options: &StlExportOptions) -> Option<String> {
        if part.path.version_kind != VersionKind::Microversion {
            return None;
        }
        Some(format!(
            "stl:{}:{}:{}:{}:{}:{}",
            part.path.document_id,
            part.path.version_id,
            part.path.element_id,
            part.id,
            options.units,
            options.mode
        ))
    }

    /// Get raw bytes from cache.
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ExportError> {
        match cacache::read(&self.cache_dir, key).await {
            Ok(data) => Ok(Some(data)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(e) => Err(ExportError::Cache(e.to_string())),
        }
    }

    /// Set raw bytes in cache.
    pub async fn set_bytes(&self, key: &str, data: &[u8]) -> Result<(), ExportError> {
        cacache::write(&self.cache_dir, key, data).await?;
        tracing::debug!(key = %key, size = data.len(), "Cached raw bytes");
        Ok(())
    }
}
