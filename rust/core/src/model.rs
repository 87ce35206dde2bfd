// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The resolved model handed to export tooling.

use crate::error::Result;
use crate::occurrence::{find_in_forest, Occurrence};
use crate::resolver::MetadataResolver;
use crate::service::CadService;
use crate::tree::build_occurrence_tree;
use crate::types::{AssemblyDefinition, AssemblyInfo, DocumentInfo, ElementPath, PartInfo};
use serde::Serialize;
use std::sync::Arc;

/// Everything known about one assembly after a build. Read-only.
#[derive(Debug, Clone, Serialize)]
pub struct ModelData {
    pub document: DocumentInfo,
    pub definition: AssemblyDefinition,
    /// Non standard-content parts, in definition order.
    pub parts: Vec<Arc<PartInfo>>,
    pub assemblies: Vec<Arc<AssemblyInfo>>,
    /// Top-level occurrences.
    pub occurrences: Vec<Occurrence>,
}

impl ModelData {
    /// Fetch and reconstruct the assembly at `root`.
    pub async fn build<S: CadService + ?Sized>(service: &S, root: &ElementPath) -> Result<Self> {
        let start = std::time::Instant::now();
        tracing::info!(element = %root, "Building assembly model");

        let (definition, document) = futures_util::try_join!(
            service.assembly_definition(root),
            service.document_info(&root.document_id),
        )?;

        let resolver = MetadataResolver::new(service);
        let (parts, assemblies) = futures_util::try_join!(
            resolver.resolve_parts(&definition.parts),
            resolver.resolve_assemblies(&definition.sub_assemblies),
        )?;
        let occurrences = build_occurrence_tree(&definition, &resolver).await?;

        let stats = resolver.fetch_stats();
        tracing::info!(
            document = %document.name,
            parts = parts.len(),
            assemblies = assemblies.len(),
            top_level = occurrences.len(),
            part_fetches = stats.part_metadata,
            name_fetches = stats.element_names,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Assembly model built"
        );

        Ok(Self::from_parts(document, definition, parts, assemblies, occurrences))
    }

    pub fn from_parts(
        document: DocumentInfo,
        definition: AssemblyDefinition,
        parts: Vec<Arc<PartInfo>>,
        assemblies: Vec<Arc<AssemblyInfo>>,
        occurrences: Vec<Occurrence>,
    ) -> Self {
        Self {
            document,
            definition,
            parts,
            assemblies,
            occurrences,
        }
    }

    /// Node for a full occurrence path.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Occurrence> {
        find_in_forest(&self.occurrences, path)
    }

    /// Total number of nodes in the forest.
    pub fn node_count(&self) -> usize {
        self.occurrences.iter().map(Occurrence::count_nodes).sum()
    }

    /// Depth-first visit of every node; top-level nodes have depth 0.
    pub fn walk<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&'a Occurrence, usize),
    {
        for root in &self.occurrences {
            root.walk(&mut visit);
        }
    }
}
