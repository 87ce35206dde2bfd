// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exporter configuration loaded from a JSON file plus environment overrides.
//!
//! File shape:
//!
//! ```json
//! {
//!   "onshape_client": {
//!     "base_url": "https://cad.onshape.com/documents/<did>/w/<wid>/e/<eid>",
//!     "access_key": "...",
//!     "secret_key": "..."
//!   },
//!   "stl_export_options": { "units": "meter", "mode": "binary" }
//! }
//! ```

use crate::error::ExportError;
use onshape_lite_core::{ElementPath, VersionKind};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// API credentials and the document element to export.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Browser URL of the root assembly element.
    pub base_url: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Options forwarded to the STL export endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StlExportOptions {
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_units() -> String {
    "meter".into()
}

fn default_mode() -> String {
    "binary".into()
}

impl Default for StlExportOptions {
    fn default() -> Self {
        Self {
            units: default_units(),
            mode: default_mode(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    onshape_client: ClientConfig,
    #[serde(default)]
    stl_export_options: StlExportOptions,
}

/// A document element URL split into server and element reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUrl {
    /// Scheme and host, with a trailing slash.
    pub server: Url,
    pub element: ElementPath,
}

impl DocumentUrl {
    /// Parse `https://host/documents/{did}/{w|v|m}/{id}/e/{eid}`.
    pub fn parse(raw: &str) -> Result<Self, ExportError> {
        let invalid = |reason: &str| ExportError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        let segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(|| invalid("URL has no path"))?
            .filter(|segment| !segment.is_empty())
            .collect();

        let [documents, did, wvm, wvmid, e, eid] = segments.as_slice() else {
            return Err(invalid("expected /documents/<did>/<w|v|m>/<id>/e/<eid>"));
        };
        if *documents != "documents" || *e != "e" {
            return Err(invalid("expected /documents/<did>/<w|v|m>/<id>/e/<eid>"));
        }
        let version_kind =
            VersionKind::from_segment(wvm).ok_or_else(|| invalid("version kind must be w, v or m"))?;

        let mut server = url.clone();
        server.set_path("/");
        server.set_query(None);
        server.set_fragment(None);

        Ok(Self {
            server,
            element: ElementPath::new(*did, version_kind, *wvmid, *eid),
        })
    }
}

/// Exporter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub stl: StlExportOptions,
    /// Root assembly parsed from `client.base_url`.
    pub root: DocumentUrl,
    /// Directory receiving STL files and `model.json`.
    pub export_dir: PathBuf,
    /// Directory for cached STL payloads.
    pub cache_dir: PathBuf,
    /// Maximum number of STL downloads in flight.
    pub max_concurrent_downloads: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Skip STL export and only write the model.
    pub skip_stl: bool,
}

impl Config {
    /// Load the file named by `ONSHAPE_CONFIG` (default
    /// `.onshape_client_config.json`) and apply environment overrides.
    pub fn load() -> Result<Self, ExportError> {
        let path = std::env::var("ONSHAPE_CONFIG")
            .unwrap_or_else(|_| ".onshape_client_config.json".into());
        Self::from_file(Path::new(&path))
    }

    pub fn from_file(path: &Path) -> Result<Self, ExportError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ExportError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ExportError> {
        let file: ConfigFile = serde_json::from_str(contents)
            .map_err(|e| ExportError::Config(format!("failed to parse config: {}", e)))?;

        let mut client = file.onshape_client;
        if let Ok(key) = std::env::var("ONSHAPE_ACCESS_KEY") {
            client.access_key = key;
        }
        if let Ok(key) = std::env::var("ONSHAPE_SECRET_KEY") {
            client.secret_key = key;
        }
        if let Ok(url) = std::env::var("ONSHAPE_BASE_URL") {
            client.base_url = url;
        }
        if client.access_key.is_empty() || client.secret_key.is_empty() {
            return Err(ExportError::Config("access_key and secret_key are required".into()));
        }

        let root = DocumentUrl::parse(&client.base_url)?;

        Ok(Self {
            client,
            stl: file.stl_export_options,
            root,
            export_dir: std::env::var("EXPORT_DIR")
                .unwrap_or_else(|_| "./export".into())
                .into(),
            cache_dir: std::env::var("CACHE_DIR")
                .unwrap_or_else(|_| {
                    std::env::current_dir()
                        .ok()
                        .and_then(|dir| dir.join(".cache").to_str().map(|s| s.to_string()))
                        .unwrap_or_else(|| "./.cache".into())
                })
                .into(),
            max_concurrent_downloads: std::env::var("MAX_CONCURRENT_DOWNLOADS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .unwrap_or_else(|_| num_cpus::get())
                .max(1),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".into())
                .parse()
                .unwrap_or(120),
            skip_stl: std::env::var("SKIP_STL")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_document_url() {
        let url = DocumentUrl::parse(
            "https://cad.onshape.com/documents/abc123/w/def456/e/ghi789?renderMode=0",
        )
        .unwrap();
        assert_eq!(url.server.as_str(), "https://cad.onshape.com/");
        assert_eq!(
            url.element,
            ElementPath::new("abc123", VersionKind::Workspace, "def456", "ghi789")
        );
    }

    #[test]
    fn parses_microversion_url() {
        let url = DocumentUrl::parse("https://company.onshape.com/documents/a/m/b/e/c").unwrap();
        assert_eq!(url.element.version_kind, VersionKind::Microversion);
        assert_eq!(url.server.host_str(), Some("company.onshape.com"));
    }

    #[test]
    fn rejects_malformed_urls() {
        for raw in [
            "not a url",
            "https://cad.onshape.com/documents/abc/w/def",
            "https://cad.onshape.com/documents/abc/x/def/e/ghi",
            "https://cad.onshape.com/files/abc/w/def/e/ghi",
        ] {
            assert!(
                matches!(DocumentUrl::parse(raw), Err(ExportError::InvalidUrl { .. })),
                "accepted {}",
                raw
            );
        }
    }

    #[test]
    fn stl_options_default_when_missing() {
        let file: ConfigFile = serde_json::from_str(
            r#"{"onshape_client": {"base_url": "u", "access_key": "a", "secret_key": "s"}}"#,
        )
        .unwrap();
        assert_eq!(file.stl_export_options, StlExportOptions::default());
        assert_eq!(file.onshape_client.access_key, "a");
    }

    #[test]
    fn partial_stl_options() {
        let options: StlExportOptions = serde_json::from_str(r#"{"units": "millimeter"}"#).unwrap();
        assert_eq!(options.units, "millimeter");
        assert_eq!(options.mode, "binary");
    }
}
