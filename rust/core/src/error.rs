// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for occurrence tree reconstruction.

use crate::types::ElementPath;

/// Result type alias for model building operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by [`CadService`](crate::CadService) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reconstructing an assembly model.
///
/// Every variant is a structural-integrity failure: the build is aborted and
/// no partial model is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A part instance references a part id missing from its element's metadata.
    #[error("part {part_id} not found in element {path}")]
    PartNotFound { path: ElementPath, part_id: String },

    /// A part instance carries no part id.
    #[error("part instance {instance_id} has no part id")]
    MissingPartId { instance_id: String },

    /// Two instances (or two root-level occurrences) share an id.
    #[error("duplicate instance id {id} in {scope}")]
    DuplicateInstanceId { id: String, scope: String },

    /// An occurrence whose first path segment names no top-level assembly node.
    #[error("occurrence {} has no top-level assembly to attach to", .path.join("/"))]
    OrphanOccurrence { path: Vec<String> },

    /// An instance id that does not exist in the definition it is looked up in.
    #[error("instance {instance_id} not defined in assembly {assembly}")]
    DanglingReference {
        assembly: ElementPath,
        instance_id: String,
    },

    /// A sub-assembly node whose element has no definition.
    #[error("no sub-assembly definition for element {0}")]
    UndefinedSubAssembly(ElementPath),

    /// Path segments remaining after a part instance was reached.
    #[error("occurrence {} continues past a part instance", .path.join("/"))]
    TrailingPathSegments { path: Vec<String> },

    /// A sub-assembly that transitively instances itself.
    #[error("sub-assembly {0} instances itself")]
    CyclicAssembly(ElementPath),

    /// An occurrence with no path segments.
    #[error("occurrence has an empty path")]
    EmptyOccurrencePath,

    /// A matrix that does not decompose into rotation and translation.
    #[error("malformed transform: {0}")]
    MalformedTransform(String),

    /// The modeling service failed to deliver a record.
    #[error("{operation} failed: {source}")]
    Fetch {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Wrap a collaborator failure.
    pub fn fetch(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Error::Fetch {
            operation,
            source: source.into(),
        }
    }
}
