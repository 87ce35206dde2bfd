// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tree log and JSON files written at the end of an export.

use crate::error::ExportError;
use crate::types::ExportManifest;
use onshape_lite_core::{ModelData, Occurrence};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One line of the tree log, indented two spaces per level.
pub fn tree_line(node: &Occurrence, depth: usize) -> String {
    let kind = if node.is_assembly() { "assembly" } else { "part" };
    let t = &node.transform.translation;
    format!(
        "{}{} [{}] {} @ ({:.4}, {:.4}, {:.4})",
        "  ".repeat(depth),
        node.name(),
        kind,
        node.id,
        t.x,
        t.y,
        t.z
    )
}

/// Log the occurrence forest depth-first.
pub fn log_tree(model: &ModelData) {
    tracing::info!(
        document = %model.document.name,
        top_level = model.occurrences.len(),
        nodes = model.node_count(),
        "Occurrence tree"
    );
    model.walk(|node, depth| tracing::info!("{}", tree_line(node, depth)));
}

async fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, ExportError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    let json = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&path, json).await?;
    tracing::info!(path = %path.display(), "Wrote {}", name);
    Ok(path)
}

/// Write `model.json` into `dir`.
pub async fn write_model(model: &ModelData, dir: &Path) -> Result<PathBuf, ExportError> {
    write_json(dir, "model.json", model).await
}

/// Write `manifest.json` into `dir`.
pub async fn write_manifest(manifest: &ExportManifest, dir: &Path) -> Result<PathBuf, ExportError> {
    write_json(dir, "manifest.json", manifest).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use onshape_lite_core::{AssemblyInfo, Color, ElementPath, OccurrenceKind, PartInfo, Transform};
    use std::sync::Arc;

    fn bracket() -> Arc<PartInfo> {
        Arc::new(PartInfo {
            id: "JHD".into(),
            name: "Bracket".into(),
            path: ElementPath::microversion("d", "m", "ps"),
            appearance: Color::WHITE,
        })
    }

    #[test]
    fn indents_by_depth() {
        let matrix = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.5, 0.0, -0.25, 1.0,
        ];
        let node = Occurrence::part(
            "Mbracket",
            Transform::from_row_major(&matrix).unwrap(),
            bracket(),
        );
        assert_eq!(
            tree_line(&node, 2),
            "    Bracket [part] Mbracket @ (0.5000, 0.0000, -0.2500)"
        );
    }

    #[tokio::test]
    async fn writes_tree_and_manifest_json() {
        let hinge = Arc::new(AssemblyInfo {
            name: "Hinge".into(),
            path: ElementPath::microversion("d", "m", "asm"),
        });
        let mut assembly = Occurrence::assembly("Mhinge", Transform::identity(), hinge);
        if let OccurrenceKind::Assembly { children, .. } = &mut assembly.kind {
            children.push(Occurrence::part("Mbracket", Transform::identity(), bracket()));
        }

        let json = serde_json::to_value(&assembly).unwrap();
        assert_eq!(json["id"], "Mhinge");
        assert_eq!(json["kind"]["type"], "assembly");
        assert_eq!(json["kind"]["children"][0]["id"], "Mbracket");
        assert_eq!(json["kind"]["children"][0]["kind"]["type"], "part");
        assert_eq!(json["kind"]["children"][0]["kind"]["name"], "Bracket");

        let dir = std::env::temp_dir().join(format!("onshape-lite-output-{}", std::process::id()));
        let manifest = ExportManifest {
            document_id: "d".into(),
            document_name: "Gearbox".into(),
            element: "d/d/m/m/e/asm".into(),
            units: "meter".into(),
            occurrence_count: 2,
            stl: Vec::new(),
        };
        let path = write_manifest(&manifest, &dir).await.unwrap();
        let written: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(written["document_name"], "Gearbox");
        assert_eq!(written["stl"].as_array().map(Vec::len), Some(0));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
