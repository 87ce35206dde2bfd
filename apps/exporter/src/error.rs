// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the exporter.

use thiserror::Error;

/// Exporter error types.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid document URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} returned {status}: {body}")]
    Status {
        operation: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("STL export of part {part_id} did not redirect to a download")]
    MissingRedirect { part_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<cacache::Error> for ExportError {
    fn from(err: cacache::Error) -> Self {
        ExportError::Cache(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for ExportError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        ExportError::Config(format!("invalid API key header: {}", err))
    }
}
