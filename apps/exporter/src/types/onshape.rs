// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire shapes of the Onshape REST API and their conversion into core types.
//!
//! Only the fields the exporter reads are declared; everything else in the
//! responses is ignored.

use onshape_lite_core::{
    Appearance, AssemblyDefinition, DocumentInfo, ElementPath, Instance, InstanceKind,
    PartMetadata, PartReference, RawOccurrence, RootAssembly, SubAssemblyDefinition,
};
use serde::Deserialize;

/// `GET /assemblies/d/{did}/{wvm}/{wvmid}/e/{eid}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyDefinitionResponse {
    pub root_assembly: RootAssemblyDto,
    #[serde(default)]
    pub sub_assemblies: Vec<SubAssemblyDto>,
    #[serde(default)]
    pub parts: Vec<PartDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootAssemblyDto {
    pub document_id: String,
    pub document_microversion: String,
    pub element_id: String,
    #[serde(default)]
    pub instances: Vec<InstanceDto>,
    #[serde(default)]
    pub occurrences: Vec<OccurrenceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubAssemblyDto {
    pub document_id: String,
    pub document_microversion: String,
    pub element_id: String,
    #[serde(default)]
    pub instances: Vec<InstanceDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum InstanceType {
    Part,
    Assembly,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InstanceType,
    pub document_id: String,
    pub document_microversion: String,
    pub element_id: String,
    #[serde(default)]
    pub part_id: Option<String>,
    #[serde(default)]
    pub is_standard_content: bool,
}

#[derive(Debug, Deserialize)]
pub struct OccurrenceDto {
    pub path: Vec<String>,
    pub transform: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartDto {
    pub document_id: String,
    pub document_microversion: String,
    pub element_id: String,
    pub part_id: String,
    #[serde(default)]
    pub is_standard_content: bool,
}

/// One entry of `GET /parts/d/{did}/{wvm}/{wvmid}/e/{eid}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartMetadataDto {
    pub part_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub appearance: Option<AppearanceDto>,
}

#[derive(Debug, Deserialize)]
pub struct AppearanceDto {
    pub color: ColorDto,
    #[serde(default = "opaque")]
    pub opacity: i64,
}

fn opaque() -> i64 {
    255
}

#[derive(Debug, Deserialize)]
pub struct ColorDto {
    pub red: i64,
    pub green: i64,
    pub blue: i64,
}

/// `GET /documents/{did}`.
#[derive(Debug, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<OwnerDto>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerDto {
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of `GET /documents/d/{did}/{wvm}/{wvmid}/elements`.
#[derive(Debug, Deserialize)]
pub struct ElementDto {
    pub id: String,
    pub name: String,
}

fn channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

impl InstanceDto {
    fn into_instance(self) -> Instance {
        let kind = match self.kind {
            InstanceType::Part => InstanceKind::Part,
            InstanceType::Assembly => InstanceKind::Assembly,
            InstanceType::Other => {
                tracing::debug!(instance = %self.id, name = %self.name, "Instance of unsupported type");
                InstanceKind::Other
            }
        };
        Instance {
            path: ElementPath::microversion(
                self.document_id,
                self.document_microversion,
                self.element_id,
            ),
            id: self.id,
            name: self.name,
            kind,
            part_id: self.part_id,
            is_standard_content: self.is_standard_content,
        }
    }
}

fn convert_instances(instances: Vec<InstanceDto>) -> Vec<Instance> {
    instances
        .into_iter()
        .map(InstanceDto::into_instance)
        .collect()
}

impl From<AssemblyDefinitionResponse> for AssemblyDefinition {
    fn from(response: AssemblyDefinitionResponse) -> Self {
        let root = response.root_assembly;
        AssemblyDefinition {
            root: RootAssembly {
                path: ElementPath::microversion(
                    root.document_id,
                    root.document_microversion,
                    root.element_id,
                ),
                instances: convert_instances(root.instances),
                occurrences: root
                    .occurrences
                    .into_iter()
                    .map(|o| RawOccurrence {
                        path: o.path,
                        transform: o.transform,
                    })
                    .collect(),
            },
            sub_assemblies: response
                .sub_assemblies
                .into_iter()
                .map(|sub| SubAssemblyDefinition {
                    path: ElementPath::microversion(
                        sub.document_id,
                        sub.document_microversion,
                        sub.element_id,
                    ),
                    instances: convert_instances(sub.instances),
                })
                .collect(),
            parts: response
                .parts
                .into_iter()
                .map(|part| PartReference {
                    path: ElementPath::microversion(
                        part.document_id,
                        part.document_microversion,
                        part.element_id,
                    ),
                    part_id: part.part_id,
                    is_standard_content: part.is_standard_content,
                })
                .collect(),
        }
    }
}

impl From<PartMetadataDto> for PartMetadata {
    fn from(dto: PartMetadataDto) -> Self {
        PartMetadata {
            part_id: dto.part_id,
            name: dto.name,
            appearance: dto.appearance.map(|a| Appearance {
                red: channel(a.color.red),
                green: channel(a.color.green),
                blue: channel(a.color.blue),
                opacity: channel(a.opacity),
            }),
        }
    }
}

impl From<DocumentResponse> for DocumentInfo {
    fn from(dto: DocumentResponse) -> Self {
        DocumentInfo {
            id: dto.id,
            name: dto.name,
            owner: dto.owner.and_then(|owner| owner.name),
            description: dto.description,
        }
    }
}
