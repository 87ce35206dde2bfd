// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export manifest written next to the STL files.

use serde::Serialize;

/// One written STL file.
#[derive(Debug, Clone, Serialize)]
pub struct StlExport {
    pub part_id: String,
    pub part_name: String,
    /// File name relative to the export directory.
    pub file: String,
    pub size: usize,
    /// SHA256 of the payload, hex encoded.
    pub sha256: String,
    /// Served from the local cache instead of downloaded.
    pub cached: bool,
}

/// Summary of one exporter run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportManifest {
    pub document_id: String,
    pub document_name: String,
    pub element: String,
    pub units: String,
    pub occurrence_count: usize,
    pub stl: Vec<StlExport>,
}
