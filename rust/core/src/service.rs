// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborator interface to the remote modeling service.

use crate::error::Result;
use crate::types::{AssemblyDefinition, DocumentInfo, ElementPath, PartMetadata};
use async_trait::async_trait;

/// Source of the raw records a model build consumes.
///
/// Implementations own transport concerns (authentication, timeouts,
/// retries) and report failures as [`Error::Fetch`](crate::Error::Fetch).
#[async_trait]
pub trait CadService: Send + Sync {
    /// Full assembly definition of the element at `path`.
    async fn assembly_definition(&self, path: &ElementPath) -> Result<AssemblyDefinition>;

    /// Descriptive metadata of a document.
    async fn document_info(&self, document_id: &str) -> Result<DocumentInfo>;

    /// Metadata of every part defined in a part studio element.
    async fn part_metadata(&self, path: &ElementPath) -> Result<Vec<PartMetadata>>;

    /// Display name of an element.
    async fn element_name(&self, path: &ElementPath) -> Result<String>;
}
