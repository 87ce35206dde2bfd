// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Memoizing lookup of part and sub-assembly metadata.
//!
//! Every cache slot is a `OnceCell`: the first caller for a key performs the
//! fetch and concurrent callers for the same key wait for that result, so an
//! element is fetched at most once per build. A failed fetch leaves the slot
//! empty and the error propagates to the caller.

use crate::error::{Error, Result};
use crate::service::CadService;
use crate::types::{
    AssemblyInfo, Color, ElementKey, ElementPath, Instance, PartInfo, PartMetadata,
    PartReference, SubAssemblyDefinition,
};
use futures_util::future::try_join_all;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

type Slots<V> = Mutex<FxHashMap<ElementKey, Arc<OnceCell<V>>>>;

/// Number of collaborator requests a resolver has issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub part_metadata: usize,
    pub element_names: usize,
}

/// Per-build metadata cache in front of a [`CadService`].
///
/// Not shared between builds: a concurrent build uses its own resolver.
pub struct MetadataResolver<'s, S: CadService + ?Sized> {
    service: &'s S,
    part_lists: Slots<Arc<[PartMetadata]>>,
    part_infos: Mutex<FxHashMap<(ElementKey, String), Arc<PartInfo>>>,
    assemblies: Slots<Arc<AssemblyInfo>>,
    part_fetches: AtomicUsize,
    element_fetches: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn slot<V>(slots: &Slots<V>, key: ElementKey) -> Arc<OnceCell<V>> {
    Arc::clone(lock(slots).entry(key).or_default())
}

impl<'s, S: CadService + ?Sized> MetadataResolver<'s, S> {
    pub fn new(service: &'s S) -> Self {
        Self {
            service,
            part_lists: Mutex::default(),
            part_infos: Mutex::default(),
            assemblies: Mutex::default(),
            part_fetches: AtomicUsize::new(0),
            element_fetches: AtomicUsize::new(0),
        }
    }

    /// Raw part metadata of an element, fetched once per [`ElementKey`].
    pub async fn part_metadata(&self, path: &ElementPath) -> Result<Arc<[PartMetadata]>> {
        let cell = slot(&self.part_lists, path.key());
        let list = cell
            .get_or_try_init(|| async {
                self.part_fetches.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(element = %path, "Fetching part metadata");
                let records = self.service.part_metadata(path).await?;
                Ok::<_, Error>(Arc::from(records))
            })
            .await?;
        Ok(Arc::clone(list))
    }

    /// Resolved info of one part. Repeated calls return the same `Arc`.
    pub async fn part_info(&self, path: &ElementPath, part_id: &str) -> Result<Arc<PartInfo>> {
        let key = (path.key(), part_id.to_string());
        let cached = lock(&self.part_infos).get(&key).cloned();
        if let Some(info) = cached {
            return Ok(info);
        }

        let records = self.part_metadata(path).await?;
        let record = records
            .iter()
            .find(|record| record.part_id == part_id)
            .ok_or_else(|| Error::PartNotFound {
                path: path.clone(),
                part_id: part_id.to_string(),
            })?;

        let info = Arc::new(PartInfo {
            id: part_id.to_string(),
            name: record.name.clone(),
            path: path.clone(),
            appearance: record.appearance.map(Color::from).unwrap_or_default(),
        });

        // A concurrent resolution of the same part may have won the race.
        Ok(Arc::clone(lock(&self.part_infos).entry(key).or_insert(info)))
    }

    /// Resolved info of a part instance.
    pub async fn part_info_for(&self, instance: &Instance) -> Result<Arc<PartInfo>> {
        let part_id = instance
            .part_id
            .as_deref()
            .ok_or_else(|| Error::MissingPartId {
                instance_id: instance.id.clone(),
            })?;
        self.part_info(&instance.path, part_id).await
    }

    /// Resolved info of a sub-assembly element, fetched once per [`ElementKey`].
    pub async fn assembly_info(&self, path: &ElementPath) -> Result<Arc<AssemblyInfo>> {
        let cell = slot(&self.assemblies, path.key());
        let info = cell
            .get_or_try_init(|| async {
                self.element_fetches.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(element = %path, "Fetching element name");
                let name = self.service.element_name(path).await?;
                Ok::<_, Error>(Arc::new(AssemblyInfo {
                    name,
                    path: path.clone(),
                }))
            })
            .await?;
        Ok(Arc::clone(info))
    }

    /// Resolve every non standard-content part reference concurrently.
    pub async fn resolve_parts(&self, parts: &[PartReference]) -> Result<Vec<Arc<PartInfo>>> {
        let skipped = parts.iter().filter(|part| part.is_standard_content).count();
        if skipped > 0 {
            tracing::debug!(skipped, "Skipping standard content parts");
        }

        try_join_all(
            parts
                .iter()
                .filter(|part| !part.is_standard_content)
                .map(|part| self.part_info(&part.path, &part.part_id)),
        )
        .await
    }

    /// Resolve every sub-assembly definition concurrently.
    pub async fn resolve_assemblies(
        &self,
        definitions: &[SubAssemblyDefinition],
    ) -> Result<Vec<Arc<AssemblyInfo>>> {
        try_join_all(
            definitions
                .iter()
                .map(|definition| self.assembly_info(&definition.path)),
        )
        .await
    }

    pub fn fetch_stats(&self) -> FetchStats {
        FetchStats {
            part_metadata: self.part_fetches.load(Ordering::Relaxed),
            element_names: self.element_fetches.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Appearance, AssemblyDefinition, DocumentInfo};
    use async_trait::async_trait;

    #[derive(Default)]
    struct CountingService {
        part_calls: AtomicUsize,
        name_calls: AtomicUsize,
    }

    #[async_trait]
    impl CadService for CountingService {
        async fn assembly_definition(&self, _path: &ElementPath) -> Result<AssemblyDefinition> {
            Err(Error::fetch("assembly definition", "not used"))
        }

        async fn document_info(&self, _document_id: &str) -> Result<DocumentInfo> {
            Err(Error::fetch("document info", "not used"))
        }

        async fn part_metadata(&self, path: &ElementPath) -> Result<Vec<PartMetadata>> {
            self.part_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if path.element_id == "broken" {
                return Err(Error::fetch("part metadata", "connection reset"));
            }
            Ok(vec![
                PartMetadata {
                    part_id: "JHD".into(),
                    name: "Bracket".into(),
                    appearance: Some(Appearance {
                        red: 200,
                        green: 100,
                        blue: 50,
                        opacity: 255,
                    }),
                },
                PartMetadata {
                    part_id: "JKD".into(),
                    name: "Plate".into(),
                    appearance: None,
                },
            ])
        }

        async fn element_name(&self, path: &ElementPath) -> Result<String> {
            self.name_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(format!("Assembly {}", path.element_id))
        }
    }

    fn studio() -> ElementPath {
        ElementPath::microversion("doc", "mv1", "studio")
    }

    #[tokio::test]
    async fn part_metadata_is_fetched_once_per_element() {
        let service = CountingService::default();
        let resolver = MetadataResolver::new(&service);

        let a = resolver.part_info(&studio(), "JHD").await.unwrap();
        let b = resolver.part_info(&studio(), "JKD").await.unwrap();
        let again = resolver.part_info(&studio(), "JHD").await.unwrap();

        assert_eq!(service.part_calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.fetch_stats().part_metadata, 1);
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(a.appearance, Color::rgba(200, 100, 50, 255));
        assert_eq!(b.appearance, Color::default());
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let service = CountingService::default();
        let resolver = MetadataResolver::new(&service);

        let path = studio();
        let (a, b, c) = tokio::join!(
            resolver.part_metadata(&path),
            resolver.part_metadata(&path),
            resolver.assembly_info(&path),
        );
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(c.unwrap().name, "Assembly studio");
        assert_eq!(service.part_calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.name_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_part_id_reports_element_and_part() {
        let service = CountingService::default();
        let resolver = MetadataResolver::new(&service);

        match resolver.part_info(&studio(), "XYZ").await {
            Err(Error::PartNotFound { path, part_id }) => {
                assert_eq!(path, studio());
                assert_eq!(part_id, "XYZ");
            }
            other => panic!("expected PartNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let service = CountingService::default();
        let resolver = MetadataResolver::new(&service);
        let broken = ElementPath::microversion("doc", "mv1", "broken");

        assert!(matches!(
            resolver.part_metadata(&broken).await,
            Err(Error::Fetch { .. })
        ));
        assert!(resolver.part_metadata(&broken).await.is_err());
        assert_eq!(service.part_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn standard_content_is_not_resolved() {
        let service = CountingService::default();
        let resolver = MetadataResolver::new(&service);
        let parts = vec![
            PartReference {
                path: studio(),
                part_id: "JHD".into(),
                is_standard_content: false,
            },
            PartReference {
                path: ElementPath::microversion("library", "mv", "bolts"),
                part_id: "M6".into(),
                is_standard_content: true,
            },
        ];

        let resolved = resolver.resolve_parts(&parts).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "Bracket");
        assert_eq!(service.part_calls.load(Ordering::SeqCst), 1);
    }
}
