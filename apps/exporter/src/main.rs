// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! onshape-lite exporter - reconstructs an Onshape assembly and exports it.
//!
//! Reads `.onshape_client_config.json` (or the file named by
//! `ONSHAPE_CONFIG`), fetches the assembly named by its document URL and:
//!
//! - logs the reconstructed occurrence tree
//! - writes one STL file per distinct part (unless `SKIP_STL` is set)
//! - writes `model.json` and `manifest.json` to the export directory
//!
//! # Environment
//!
//! - `RUST_LOG` - log filter (default `info,onshape_lite_exporter=debug`)
//! - `LOG_FORMAT=json` - JSON log lines instead of the pretty formatter
//! - `ONSHAPE_ACCESS_KEY`, `ONSHAPE_SECRET_KEY`, `ONSHAPE_BASE_URL` - override the file
//! - `EXPORT_DIR`, `CACHE_DIR`, `MAX_CONCURRENT_DOWNLOADS`, `REQUEST_TIMEOUT_SECS`

use anyhow::Context;
use onshape_lite_core::ModelData;
use std::time::Instant;

mod config;
mod error;
mod services;
mod types;

use config::Config;
use services::{DiskCache, OnshapeClient};
use types::ExportManifest;

fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,onshape_lite_exporter=debug".into());

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::load().context("Failed to load configuration")?;

    tracing::info!(
        server = %config.root.server,
        element = %config.root.element,
        export_dir = %config.export_dir.display(),
        cache_dir = %config.cache_dir.display(),
        max_concurrent_downloads = config.max_concurrent_downloads,
        "Starting onshape-lite exporter"
    );

    let client = OnshapeClient::new(&config).context("Failed to create Onshape client")?;
    let cache = DiskCache::new(&config.cache_dir).await;

    let start = Instant::now();
    let model = ModelData::build(&client, &config.root.element)
        .await
        .context("Failed to reconstruct assembly")?;
    services::log_tree(&model);

    let stl = if config.skip_stl {
        tracing::info!("Skipping STL export");
        Vec::new()
    } else {
        services::save_stls(
            &client,
            &cache,
            &model.parts,
            &config.export_dir,
            &config.stl,
            config.max_concurrent_downloads,
        )
        .await
        .context("Failed to export STL files")?
    };

    services::write_model(&model, &config.export_dir)
        .await
        .context("Failed to write model")?;

    let manifest = ExportManifest {
        document_id: model.document.id.clone(),
        document_name: model.document.name.clone(),
        element: config.root.element.to_string(),
        units: config.stl.units.clone(),
        occurrence_count: model.node_count(),
        stl,
    };
    services::write_manifest(&manifest, &config.export_dir)
        .await
        .context("Failed to write manifest")?;

    tracing::info!(
        parts = model.parts.len(),
        assemblies = model.assemblies.len(),
        occurrences = manifest.occurrence_count,
        stl_files = manifest.stl.len(),
        cached = manifest.stl.iter().filter(|s| s.cached).count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Export complete"
    );

    Ok(())
}
