// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nodes of the reconstructed occurrence forest.

use crate::transform::Transform;
use crate::types::{AssemblyInfo, PartInfo};
use serde::Serialize;
use std::sync::Arc;

/// One placed instance in the assembly tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    /// Instance id, unique among siblings.
    pub id: String,
    pub transform: Transform,
    pub kind: OccurrenceKind,
}

/// What an occurrence places.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OccurrenceKind {
    Part(Arc<PartInfo>),
    Assembly {
        info: Arc<AssemblyInfo>,
        /// Insertion order, not sorted.
        children: Vec<Occurrence>,
    },
}

impl Occurrence {
    pub fn part(id: impl Into<String>, transform: Transform, part: Arc<PartInfo>) -> Self {
        Self {
            id: id.into(),
            transform,
            kind: OccurrenceKind::Part(part),
        }
    }

    pub fn assembly(id: impl Into<String>, transform: Transform, info: Arc<AssemblyInfo>) -> Self {
        Self {
            id: id.into(),
            transform,
            kind: OccurrenceKind::Assembly {
                info,
                children: Vec::new(),
            },
        }
    }

    /// Display name of the placed part or assembly.
    pub fn name(&self) -> &str {
        match &self.kind {
            OccurrenceKind::Part(part) => &part.name,
            OccurrenceKind::Assembly { info, .. } => &info.name,
        }
    }

    pub fn is_assembly(&self) -> bool {
        matches!(self.kind, OccurrenceKind::Assembly { .. })
    }

    pub fn part_info(&self) -> Option<&Arc<PartInfo>> {
        match &self.kind {
            OccurrenceKind::Part(part) => Some(part),
            OccurrenceKind::Assembly { .. } => None,
        }
    }

    pub fn assembly_info(&self) -> Option<&Arc<AssemblyInfo>> {
        match &self.kind {
            OccurrenceKind::Assembly { info, .. } => Some(info),
            OccurrenceKind::Part(_) => None,
        }
    }

    /// Children of an assembly; empty for parts.
    pub fn children(&self) -> &[Occurrence] {
        match &self.kind {
            OccurrenceKind::Assembly { children, .. } => children,
            OccurrenceKind::Part(_) => &[],
        }
    }

    pub fn find_child(&self, id: &str) -> Option<&Occurrence> {
        self.children().iter().find(|child| child.id == id)
    }

    /// Follow successive child ids starting below this node.
    pub fn descend<S: AsRef<str>>(&self, path: &[S]) -> Option<&Occurrence> {
        path.iter()
            .try_fold(self, |node, id| node.find_child(id.as_ref()))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn count_nodes(&self) -> usize {
        1 + self.children().iter().map(Occurrence::count_nodes).sum::<usize>()
    }

    /// Depth-first pre-order visit; the root of the walk has depth 0.
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a Occurrence, usize),
    {
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            visit(node, depth);
            for child in node.children().iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    /// Sort children recursively by id.
    pub fn sort_by_id(&mut self) {
        if let OccurrenceKind::Assembly { children, .. } = &mut self.kind {
            children.sort_by(|a, b| a.id.cmp(&b.id));
            children.iter_mut().for_each(Occurrence::sort_by_id);
        }
    }
}

/// Locate the node for a full occurrence path within a forest.
pub fn find_in_forest<'a, S: AsRef<str>>(
    forest: &'a [Occurrence],
    path: &[S],
) -> Option<&'a Occurrence> {
    let (first, rest) = path.split_first()?;
    forest
        .iter()
        .find(|node| node.id == first.as_ref())?
        .descend(rest)
}
