// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconstruction of the occurrence forest from the flat occurrence list.
//!
//! The service returns every occurrence of the assembly as a path of
//! instance ids plus an absolute transform. Building the tree runs in two
//! phases:
//!
//! 1. Occurrences with a single-segment path become the top-level nodes,
//!    resolved against the root assembly's instances.
//! 2. Longer paths are walked segment by segment from their top-level node.
//!    Each segment is looked up in the definition of the current assembly
//!    node; parts are appended as leaves and missing intermediate
//!    sub-assemblies are materialized on the way down.
//!
//! An intermediate sub-assembly created during phase 2 takes its transform
//! from the first root-level occurrence whose path ends with the same
//! instance id. Instance ids are only unique within one definition, so an id
//! reused at another nesting depth can bind the wrong placement.

use crate::error::{Error, Result};
use crate::occurrence::{Occurrence, OccurrenceKind};
use crate::resolver::MetadataResolver;
use crate::service::CadService;
use crate::transform::Transform;
use crate::types::{AssemblyDefinition, ElementKey, ElementPath, Instance, InstanceKind, RawOccurrence};
use rustc_hash::FxHashMap;
use std::sync::Arc;

type InstanceIndex<'d> = FxHashMap<&'d str, &'d Instance>;

struct SubAssembly<'d> {
    path: &'d ElementPath,
    instances: InstanceIndex<'d>,
    /// Keys of instanced sub-assemblies, in definition order.
    children: Vec<ElementKey>,
}

/// Lookup tables over one assembly definition.
struct DefinitionIndex<'d> {
    root_path: &'d ElementPath,
    root: InstanceIndex<'d>,
    sub_assemblies: FxHashMap<ElementKey, SubAssembly<'d>>,
    occurrences: &'d [RawOccurrence],
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

fn index_instances<'d>(instances: &'d [Instance], owner: &ElementPath) -> Result<InstanceIndex<'d>> {
    let mut index = InstanceIndex::default();
    for instance in instances {
        if index.insert(instance.id.as_str(), instance).is_some() {
            return Err(Error::DuplicateInstanceId {
                id: instance.id.clone(),
                scope: owner.to_string(),
            });
        }
    }
    Ok(index)
}

impl<'d> DefinitionIndex<'d> {
    fn new(definition: &'d AssemblyDefinition) -> Result<Self> {
        let root = index_instances(&definition.root.instances, &definition.root.path)?;

        let mut sub_assemblies = FxHashMap::default();
        for sub in &definition.sub_assemblies {
            let instances = index_instances(&sub.instances, &sub.path)?;
            let children = sub
                .instances
                .iter()
                .filter(|instance| instance.kind == InstanceKind::Assembly)
                .map(|instance| instance.path.key())
                .collect();
            sub_assemblies.entry(sub.path.key()).or_insert(SubAssembly {
                path: &sub.path,
                instances,
                children,
            });
        }

        let index = Self {
            root_path: &definition.root.path,
            root,
            sub_assemblies,
            occurrences: &definition.root.occurrences,
        };
        index.check_acyclic()?;
        Ok(index)
    }

    /// Reject sub-assemblies that transitively instance themselves.
    fn check_acyclic(&self) -> Result<()> {
        let mut marks: FxHashMap<&ElementKey, Mark> = FxHashMap::default();

        for start in self.sub_assemblies.keys() {
            if marks.contains_key(start) {
                continue;
            }
            marks.insert(start, Mark::Active);
            let mut stack: Vec<(&ElementKey, usize)> = vec![(start, 0)];

            while let Some(frame) = stack.last_mut() {
                let key = frame.0;
                let children = &self.sub_assemblies[key].children;
                if frame.1 == children.len() {
                    marks.insert(key, Mark::Done);
                    stack.pop();
                    continue;
                }
                let child = &children[frame.1];
                frame.1 += 1;

                match marks.get(child) {
                    Some(Mark::Active) => {
                        return Err(Error::CyclicAssembly(
                            self.sub_assemblies[child].path.clone(),
                        ));
                    }
                    Some(Mark::Done) => {}
                    None => {
                        // Undefined children surface during the build if reached.
                        if self.sub_assemblies.contains_key(child) {
                            marks.insert(child, Mark::Active);
                            stack.push((child, 0));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn root_instance(&self, id: &str) -> Result<&'d Instance> {
        self.root
            .get(id)
            .copied()
            .ok_or_else(|| Error::DanglingReference {
                assembly: self.root_path.clone(),
                instance_id: id.to_string(),
            })
    }

    fn instance_in(&self, assembly: &ElementPath, id: &str) -> Result<&'d Instance> {
        let sub = self
            .sub_assemblies
            .get(&assembly.key())
            .ok_or_else(|| Error::UndefinedSubAssembly(assembly.clone()))?;
        sub.instances
            .get(id)
            .copied()
            .ok_or_else(|| Error::DanglingReference {
                assembly: assembly.clone(),
                instance_id: id.to_string(),
            })
    }

    fn is_unsupported(&self, id: &str) -> bool {
        self.root
            .get(id)
            .is_some_and(|instance| instance.kind == InstanceKind::Other)
    }

    /// First root-level occurrence whose path ends with `id`.
    fn placement_of(&self, id: &str) -> Option<&'d RawOccurrence> {
        self.occurrences
            .iter()
            .find(|occurrence| occurrence.leaf_id() == Some(id))
    }
}

/// Build the occurrence forest of an assembly definition.
///
/// Top-level nodes appear in the order their occurrences first appear in the
/// flat list; children in the order they are attached. Nothing is sorted.
pub async fn build_occurrence_tree<S: CadService + ?Sized>(
    definition: &AssemblyDefinition,
    resolver: &MetadataResolver<'_, S>,
) -> Result<Vec<Occurrence>> {
    let index = DefinitionIndex::new(definition)?;
    let occurrences = &definition.root.occurrences;

    let mut forest: Vec<Occurrence> = Vec::new();
    let mut top_level: FxHashMap<&str, usize> = FxHashMap::default();

    for occurrence in occurrences {
        let id = match occurrence.path.as_slice() {
            [] => return Err(Error::EmptyOccurrencePath),
            [id] => id,
            _ => continue,
        };
        if top_level.contains_key(id.as_str()) {
            return Err(Error::DuplicateInstanceId {
                id: id.clone(),
                scope: "root occurrences".to_string(),
            });
        }

        let instance = index.root_instance(id)?;
        let node = match instance.kind {
            InstanceKind::Part if instance.is_standard_content => {
                tracing::debug!(instance = %id, "Skipping standard content");
                continue;
            }
            InstanceKind::Other => {
                tracing::debug!(instance = %id, name = %instance.name, "Skipping unsupported instance");
                continue;
            }
            InstanceKind::Part => Occurrence::part(
                id.clone(),
                Transform::from_row_major(&occurrence.transform)?,
                resolver.part_info_for(instance).await?,
            ),
            InstanceKind::Assembly => Occurrence::assembly(
                id.clone(),
                Transform::from_row_major(&occurrence.transform)?,
                resolver.assembly_info(&instance.path).await?,
            ),
        };
        top_level.insert(id.as_str(), forest.len());
        forest.push(node);
    }

    for occurrence in occurrences.iter().filter(|o| o.path.len() > 1) {
        attach(occurrence, &mut forest, &top_level, &index, resolver).await?;
    }

    tracing::debug!(
        top_level = forest.len(),
        nodes = forest.iter().map(Occurrence::count_nodes).sum::<usize>(),
        "Built occurrence tree"
    );

    Ok(forest)
}

/// Walk one multi-segment occurrence down from its top-level node.
async fn attach<S: CadService + ?Sized>(
    occurrence: &RawOccurrence,
    forest: &mut [Occurrence],
    top_level: &FxHashMap<&str, usize>,
    index: &DefinitionIndex<'_>,
    resolver: &MetadataResolver<'_, S>,
) -> Result<()> {
    let path = &occurrence.path;
    let orphan = || Error::OrphanOccurrence { path: path.clone() };

    let mut current = match top_level.get(path[0].as_str()) {
        Some(&position) => &mut forest[position],
        // Nothing below an unsupported top-level instance was built.
        None if index.is_unsupported(&path[0]) => return Ok(()),
        None => return Err(orphan()),
    };

    for (depth, segment) in path.iter().enumerate().skip(1) {
        let (info, children) = match &mut current.kind {
            OccurrenceKind::Assembly { info, children } => (Arc::clone(info), children),
            OccurrenceKind::Part(_) => return Err(orphan()),
        };

        let instance = index.instance_in(&info.path, segment)?;
        match instance.kind {
            InstanceKind::Other => {
                tracing::debug!(instance = %segment, name = %instance.name, "Skipping unsupported instance");
                return Ok(());
            }
            InstanceKind::Part => {
                if depth + 1 != path.len() {
                    return Err(Error::TrailingPathSegments { path: path.clone() });
                }
                if instance.is_standard_content {
                    tracing::debug!(instance = %segment, "Skipping standard content");
                    return Ok(());
                }
                let transform = Transform::from_row_major(&occurrence.transform)?;
                let part = resolver.part_info_for(instance).await?;
                children.push(Occurrence::part(segment.clone(), transform, part));
                return Ok(());
            }
            InstanceKind::Assembly => {
                let position = match children.iter().position(|child| child.id == *segment) {
                    Some(position) => position,
                    None => {
                        let placement =
                            index
                                .placement_of(segment)
                                .ok_or_else(|| Error::DanglingReference {
                                    assembly: info.path.clone(),
                                    instance_id: segment.clone(),
                                })?;
                        let transform = Transform::from_row_major(&placement.transform)?;
                        let assembly = resolver.assembly_info(&instance.path).await?;
                        children.push(Occurrence::assembly(segment.clone(), transform, assembly));
                        children.len() - 1
                    }
                };
                if !children[position].is_assembly() {
                    return Err(orphan());
                }
                current = &mut children[position];
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RootAssembly, SubAssemblyDefinition};

    fn assembly_instance(id: &str, element: &str) -> Instance {
        Instance {
            id: id.into(),
            name: id.into(),
            kind: InstanceKind::Assembly,
            path: ElementPath::microversion("d", "m", element),
            part_id: None,
            is_standard_content: false,
        }
    }

    fn definition(subs: Vec<SubAssemblyDefinition>) -> AssemblyDefinition {
        AssemblyDefinition {
            root: RootAssembly {
                path: ElementPath::microversion("d", "m", "root"),
                instances: vec![],
                occurrences: vec![],
            },
            sub_assemblies: subs,
            parts: vec![],
        }
    }

    #[test]
    fn detects_indirect_cycle() {
        let def = definition(vec![
            SubAssemblyDefinition {
                path: ElementPath::microversion("d", "m", "a"),
                instances: vec![assembly_instance("i1", "b")],
            },
            SubAssemblyDefinition {
                path: ElementPath::microversion("d", "m", "b"),
                instances: vec![assembly_instance("i2", "a")],
            },
        ]);
        assert!(matches!(
            DefinitionIndex::new(&def),
            Err(Error::CyclicAssembly(_))
        ));
    }

    #[test]
    fn shared_sub_assembly_is_not_a_cycle() {
        let def = definition(vec![
            SubAssemblyDefinition {
                path: ElementPath::microversion("d", "m", "a"),
                instances: vec![assembly_instance("i1", "c"), assembly_instance("i2", "b")],
            },
            SubAssemblyDefinition {
                path: ElementPath::microversion("d", "m", "b"),
                instances: vec![assembly_instance("i3", "c")],
            },
            SubAssemblyDefinition {
                path: ElementPath::microversion("d", "m", "c"),
                instances: vec![],
            },
        ]);
        assert!(DefinitionIndex::new(&def).is_ok());
    }

    #[test]
    fn duplicate_ids_within_definition() {
        let def = definition(vec![SubAssemblyDefinition {
            path: ElementPath::microversion("d", "m", "a"),
            instances: vec![assembly_instance("i1", "x"), assembly_instance("i1", "y")],
        }]);
        match DefinitionIndex::new(&def) {
            Err(Error::DuplicateInstanceId { id, scope }) => {
                assert_eq!(id, "i1");
                assert_eq!(scope, "d/d/m/m/e/a");
            }
            _ => panic!("expected DuplicateInstanceId"),
        }
    }

    #[test]
    fn placement_lookup_matches_last_segment() {
        let mut def = definition(vec![]);
        def.root.occurrences = vec![
            RawOccurrence {
                path: vec!["a".into()],
                transform: vec![0.0; 16],
            },
            RawOccurrence {
                path: vec!["a".into(), "b".into()],
                transform: vec![1.0; 16],
            },
        ];
        let index = DefinitionIndex::new(&def).unwrap();
        assert_eq!(index.placement_of("b").map(|o| o.transform[0]), Some(1.0));
        assert!(index.placement_of("c").is_none());
    }
}
