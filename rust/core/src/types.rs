// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw records consumed from the modeling service and resolved metadata.
//!
//! These types are wire-agnostic: the collaborator that talks to the remote
//! service converts its own response shapes into them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one document element at one immutable version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementKey {
    pub document_id: String,
    pub version_id: String,
    pub element_id: String,
}

/// Which kind of version identifier an [`ElementPath`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VersionKind {
    Workspace,
    Version,
    Microversion,
}

impl VersionKind {
    /// URL segment used by the service (`w`, `v` or `m`).
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionKind::Workspace => "w",
            VersionKind::Version => "v",
            VersionKind::Microversion => "m",
        }
    }

    /// Parse a URL segment.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "w" => Some(VersionKind::Workspace),
            "v" => Some(VersionKind::Version),
            "m" => Some(VersionKind::Microversion),
            _ => None,
        }
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to an element as used by an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementPath {
    pub document_id: String,
    pub version_kind: VersionKind,
    pub version_id: String,
    pub element_id: String,
}

impl ElementPath {
    pub fn new(
        document_id: impl Into<String>,
        version_kind: VersionKind,
        version_id: impl Into<String>,
        element_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            version_kind,
            version_id: version_id.into(),
            element_id: element_id.into(),
        }
    }

    /// Microversion reference, the form used inside assembly definitions.
    pub fn microversion(
        document_id: impl Into<String>,
        microversion_id: impl Into<String>,
        element_id: impl Into<String>,
    ) -> Self {
        Self::new(
            document_id,
            VersionKind::Microversion,
            microversion_id,
            element_id,
        )
    }

    /// Cache identity of the referenced element.
    pub fn key(&self) -> ElementKey {
        ElementKey {
            document_id: self.document_id.clone(),
            version_id: self.version_id.clone(),
            element_id: self.element_id.clone(),
        }
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "d/{}/{}/{}/e/{}",
            self.document_id, self.version_kind, self.version_id, self.element_id
        )
    }
}

/// Kind of element an instance refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceKind {
    Part,
    Assembly,
    /// Any other instance type (features, mate connectors). Occurrences
    /// through such an instance are skipped.
    Other,
}

/// A named reference to an element inside one assembly definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Unique within the owning definition's instance list.
    pub id: String,
    pub name: String,
    pub kind: InstanceKind,
    pub path: ElementPath,
    /// Present for part instances only.
    pub part_id: Option<String>,
    pub is_standard_content: bool,
}

/// One entry of the flat occurrence list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOccurrence {
    /// Instance ids from a root-level instance down to this occurrence.
    pub path: Vec<String>,
    /// Absolute placement, 16 row-major values.
    pub transform: Vec<f64>,
}

impl RawOccurrence {
    /// Id of the instance this occurrence places.
    pub fn leaf_id(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

/// The top-level assembly of a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootAssembly {
    pub path: ElementPath,
    pub instances: Vec<Instance>,
    pub occurrences: Vec<RawOccurrence>,
}

/// A sub-assembly's own instance list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAssemblyDefinition {
    pub path: ElementPath,
    pub instances: Vec<Instance>,
}

/// A distinct part used somewhere in the assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartReference {
    pub path: ElementPath,
    pub part_id: String,
    pub is_standard_content: bool,
}

/// Complete assembly definition as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyDefinition {
    pub root: RootAssembly,
    pub sub_assemblies: Vec<SubAssemblyDefinition>,
    pub parts: Vec<PartReference>,
}

/// Descriptive document metadata, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub name: String,
    pub owner: Option<String>,
    pub description: Option<String>,
}

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Display color plus opacity of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub opacity: u8,
}

impl From<Appearance> for Color {
    fn from(a: Appearance) -> Self {
        Color::rgba(a.red, a.green, a.blue, a.opacity)
    }
}

/// One record of the part-metadata-by-element response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartMetadata {
    pub part_id: String,
    pub name: String,
    pub appearance: Option<Appearance>,
}

/// Resolved part metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInfo {
    pub id: String,
    pub name: String,
    pub path: ElementPath,
    pub appearance: Color,
}

/// Resolved sub-assembly metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyInfo {
    pub name: String,
    pub path: ElementPath,
}
