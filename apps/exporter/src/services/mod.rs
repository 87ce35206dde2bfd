// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service modules for talking to Onshape and writing the export.

pub mod cache;
pub mod onshape;
pub mod output;
pub mod stl;

pub use cache::DiskCache;
pub use onshape::OnshapeClient;
pub use output::{log_tree, write_manifest, write_model};
pub use stl::save_stls;
