// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-part STL export.
//!
//! Each distinct part is exported once, whatever the number of occurrences
//! placing it. Downloads run with bounded concurrency and immutable
//! (microversion) payloads are served from the disk cache when present.

use crate::config::StlExportOptions;
use crate::error::ExportError;
use crate::services::{DiskCache, OnshapeClient};
use crate::types::StlExport;
use futures::stream::{self, StreamExt, TryStreamExt};
use onshape_lite_core::PartInfo;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;
use std::sync::Arc;

/// Replace characters that are not portable in file names.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').trim();
    if cleaned.is_empty() {
        "part".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Assign each part a distinct `.stl` file name.
///
/// Parts sharing a display name are disambiguated with their part id.
pub fn file_names(parts: &[Arc<PartInfo>]) -> Vec<String> {
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    for part in parts {
        *counts.entry(sanitize_file_name(&part.name)).or_default() += 1;
    }

    let mut taken = FxHashSet::default();
    parts
        .iter()
        .map(|part| {
            let base = sanitize_file_name(&part.name);
            let first = if counts[&base] > 1 {
                format!("{} ({})", base, sanitize_file_name(&part.id))
            } else {
                base
            };
            // Same name and id in two part studios.
            let mut stem = first.clone();
            let mut n = 2;
            while !taken.insert(stem.clone()) {
                stem = format!("{} {}", first, n);
                n += 1;
            }
            format!("{}.stl", stem)
        })
        .collect()
}

async fn fetch_stl(
    client: &OnshapeClient,
    cache: &DiskCache,
    part: &PartInfo,
    options: &StlExportOptions,
) -> Result<(Vec<u8>, bool), ExportError> {
    let key = DiskCache::stl_key(part, options);
    if let Some(key) = &key {
        if let Some(data) = cache.get_bytes(key).await? {
            tracing::debug!(part = %part.id, "STL cache hit");
            return Ok((data, true));
        }
    }

    let location = client.export_stl_location(part, options).await?;
    let data = client.download_stl(location).await?;

    if let Some(key) = &key {
        if let Err(e) = cache.set_bytes(key, &data).await {
            tracing::warn!(part = %part.id, error = %e, "Failed to cache STL");
        }
    }
    Ok((data.to_vec(), false))
}

/// Export every part to `dir`, at most `concurrency` downloads at a time.
///
/// The returned entries follow the order of `parts`.
pub async fn save_stls(
    client: &OnshapeClient,
    cache: &DiskCache,
    parts: &[Arc<PartInfo>],
    dir: &Path,
    options: &StlExportOptions,
    concurrency: usize,
) -> Result<Vec<StlExport>, ExportError> {
    tokio::fs::create_dir_all(dir).await?;
    let names = file_names(parts);

    let mut exports: Vec<(usize, StlExport)> = stream::iter(parts.iter().zip(names).enumerate())
        .map(|(index, (part, file))| async move {
            let (data, cached) = fetch_stl(client, cache, part, options).await?;
            tokio::fs::write(dir.join(&file), &data).await?;
            tracing::info!(
                part = %part.id,
                name = %part.name,
                file = %file,
                size = data.len(),
                cached,
                "Saved STL"
            );
            Ok::<_, ExportError>((
                index,
                StlExport {
                    part_id: part.id.clone(),
                    part_name: part.name.clone(),
                    size: data.len(),
                    sha256: DiskCache::digest(&data),
                    file,
                    cached,
                },
            ))
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    exports.sort_by_key(|(index, _)| *index);
    Ok(exports.into_iter().map(|(_, export)| export).collect())
}
