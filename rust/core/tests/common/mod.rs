// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory modeling service and fixture helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use onshape_lite_core::{
    Appearance, AssemblyDefinition, CadService, DocumentInfo, ElementKey, ElementPath, Error,
    Instance, InstanceKind, PartMetadata, PartReference, RawOccurrence, Result, RootAssembly,
    SubAssemblyDefinition,
};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const DOC: &str = "doc0";
pub const MV: &str = "mv0";

pub fn element(id: &str) -> ElementPath {
    ElementPath::microversion(DOC, MV, id)
}

pub fn part_instance(id: &str, studio: &str, part_id: &str) -> Instance {
    Instance {
        id: id.into(),
        name: format!("{} <1>", part_id),
        kind: InstanceKind::Part,
        path: element(studio),
        part_id: Some(part_id.into()),
        is_standard_content: false,
    }
}

pub fn assembly_instance(id: &str, assembly: &str) -> Instance {
    Instance {
        id: id.into(),
        name: format!("{} <1>", assembly),
        kind: InstanceKind::Assembly,
        path: element(assembly),
        part_id: None,
        is_standard_content: false,
    }
}

/// Row-major placement with translation in the last row.
pub fn translation(x: f64, y: f64, z: f64) -> Vec<f64> {
    vec![
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        x, y, z, 1.0,
    ]
}

pub fn occurrence(path: &[&str], transform: Vec<f64>) -> RawOccurrence {
    RawOccurrence {
        path: path.iter().map(|s| s.to_string()).collect(),
        transform,
    }
}

/// Builder for assembly definitions.
pub struct Fixture {
    pub definition: AssemblyDefinition,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            definition: AssemblyDefinition {
                root: RootAssembly {
                    path: element("root"),
                    instances: Vec::new(),
                    occurrences: Vec::new(),
                },
                sub_assemblies: Vec::new(),
                parts: Vec::new(),
            },
        }
    }

    pub fn root_instance(mut self, instance: Instance) -> Self {
        self.register_part(&instance);
        self.definition.root.instances.push(instance);
        self
    }

    pub fn sub_assembly(mut self, assembly: &str, instances: Vec<Instance>) -> Self {
        for instance in &instances {
            self.register_part(instance);
        }
        self.definition.sub_assemblies.push(SubAssemblyDefinition {
            path: element(assembly),
            instances,
        });
        self
    }

    pub fn occurrence(mut self, path: &[&str], transform: Vec<f64>) -> Self {
        self.definition
            .root
            .occurrences
            .push(occurrence(path, transform));
        self
    }

    fn register_part(&mut self, instance: &Instance) {
        let Some(part_id) = &instance.part_id else {
            return;
        };
        let known = self
            .definition
            .parts
            .iter()
            .any(|p| p.path == instance.path && &p.part_id == part_id);
        if !known {
            self.definition.parts.push(PartReference {
                path: instance.path.clone(),
                part_id: part_id.clone(),
                is_standard_content: instance.is_standard_content,
            });
        }
    }
}

/// Modeling service backed by fixture data, counting every request.
#[derive(Default)]
pub struct MockService {
    pub definition: Option<AssemblyDefinition>,
    pub parts: FxHashMap<ElementKey, Vec<PartMetadata>>,
    pub names: FxHashMap<ElementKey, String>,
    pub part_calls: Mutex<FxHashMap<ElementKey, usize>>,
    pub name_calls: AtomicUsize,
}

impl MockService {
    pub fn new(definition: AssemblyDefinition) -> Self {
        Self {
            definition: Some(definition),
            ..Self::default()
        }
    }

    pub fn with_parts(mut self, studio: &str, parts: &[(&str, &str)]) -> Self {
        self.parts.insert(
            element(studio).key(),
            parts
                .iter()
                .map(|(id, name)| PartMetadata {
                    part_id: id.to_string(),
                    name: name.to_string(),
                    appearance: Some(Appearance {
                        red: 128,
                        green: 128,
                        blue: 128,
                        opacity: 255,
                    }),
                })
                .collect(),
        );
        self
    }

    pub fn with_name(mut self, assembly: &str, name: &str) -> Self {
        self.names.insert(element(assembly).key(), name.to_string());
        self
    }

    pub fn part_calls_for(&self, studio: &str) -> usize {
        self.part_calls
            .lock()
            .unwrap()
            .get(&element(studio).key())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_part_calls(&self) -> usize {
        self.part_calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl CadService for MockService {
    async fn assembly_definition(&self, _path: &ElementPath) -> Result<AssemblyDefinition> {
        self.definition
            .clone()
            .ok_or_else(|| Error::fetch("assembly definition", "no fixture"))
    }

    async fn document_info(&self, document_id: &str) -> Result<DocumentInfo> {
        Ok(DocumentInfo {
            id: document_id.to_string(),
            name: "Gearbox".to_string(),
            owner: Some("Test Owner".to_string()),
            description: None,
        })
    }

    async fn part_metadata(&self, path: &ElementPath) -> Result<Vec<PartMetadata>> {
        *self
            .part_calls
            .lock()
            .unwrap()
            .entry(path.key())
            .or_default() += 1;
        tokio::task::yield_now().await;
        self.parts
            .get(&path.key())
            .cloned()
            .ok_or_else(|| Error::fetch("part metadata", format!("no element {}", path)))
    }

    async fn element_name(&self, path: &ElementPath) -> Result<String> {
        self.name_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self
            .names
            .get(&path.key())
            .cloned()
            .unwrap_or_else(|| format!("Assembly {}", path.element_id)))
    }
}
