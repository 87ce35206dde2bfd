// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # onshape-lite core
//!
//! Reconstructs the nesting of parts and sub-assemblies of an Onshape
//! assembly from the flat, path-indexed occurrence list the service returns.
//!
//! ## Overview
//!
//! - **Transform decoding**: row-major 4x4 placements to translation plus
//!   unit quaternion ([`Transform`])
//! - **Metadata resolution**: single-flight, per-build cache of part and
//!   sub-assembly metadata ([`MetadataResolver`])
//! - **Tree building**: two-phase reconstruction of the occurrence forest
//!   ([`build_occurrence_tree`])
//! - **Model aggregate**: everything bundled into one read-only [`ModelData`]
//!
//! The remote service is reached through the [`CadService`] trait; transport
//! lives in the exporter application.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use onshape_lite_core::{ElementPath, ModelData};
//!
//! let root = ElementPath::microversion(did, mvid, eid);
//! let model = ModelData::build(&client, &root).await?;
//! model.walk(|node, depth| println!("{}{}", "  ".repeat(depth), node.name()));
//! ```

pub mod error;
pub mod model;
pub mod occurrence;
pub mod resolver;
pub mod service;
pub mod transform;
pub mod tree;
pub mod types;

pub use error::{BoxError, Error, Result};
pub use model::ModelData;
pub use occurrence::{find_in_forest, Occurrence, OccurrenceKind};
pub use resolver::{FetchStats, MetadataResolver};
pub use service::CadService;
pub use transform::Transform;
pub use tree::build_occurrence_tree;
pub use types::{
    Appearance, AssemblyDefinition, AssemblyInfo, Color, DocumentInfo, ElementKey, ElementPath,
    Instance, InstanceKind, PartInfo, PartMetadata, PartReference, RawOccurrence, RootAssembly,
    SubAssemblyDefinition, VersionKind,
};
