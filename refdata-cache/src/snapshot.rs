//! Persisted snapshot for restart survival.
//!
//! The snapshot is a JSON image of the store's entries plus the policy
//! version at save time. Restoring never trusts the file blindly: every
//! entry is admitted through the same staleness policy check as a live
//! lookup, so an image saved before an invalidation (or long ago) simply
//! restores nothing.

use std::collections::HashMap;
use std::path::Path;

use refdata_core::{CacheEntry, CacheKey, CatalogId, PolicyVersion, SnapshotError};
use serde::{Deserialize, Serialize};

use crate::policy::classify;
use crate::store::ReferenceStore;

/// Serde image of the reference store.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: PolicyVersion,
    pub entries: HashMap<CacheKey, CacheEntry>,
}

impl Snapshot {
    /// Capture the store's current entries and policy version.
    pub async fn capture(store: &ReferenceStore) -> Self {
        Self {
            version: store.current_version(),
            entries: store.dump().await,
        }
    }

    /// Write the snapshot to `path` as JSON, replacing the whole file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| SnapshotError::Malformed {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read a snapshot from `path`.
    pub fn read(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = std::fs::read(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Restore this snapshot into `store`, admitting only entries that
    /// pass the live staleness policy. Returns how many were admitted.
    ///
    /// The store's policy version is fast-forwarded to the snapshot's (it
    /// never rewinds), so entries saved under an older version classify
    /// stale and are dropped.
    pub async fn restore(self, store: &ReferenceStore) -> usize {
        store.adopt_version(self.version);
        let now = chrono::Utc::now();
        let live = store.current_version();

        let mut admitted = 0;
        for (key, entry) in self.entries {
            let window = store.window(&CatalogId::new(key.catalog_name()));
            if classify(Some(&entry), now, live, window).is_fresh() {
                store.restore_entry(key, entry).await;
                admitted += 1;
            }
        }
        tracing::info!(admitted, version = %live, "snapshot restored");
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CacheConfig;
    use chrono::Utc;
    use refdata_core::{CatalogRegistry, CatalogSpec, OptionItem};
    use std::time::Duration;

    fn store() -> ReferenceStore {
        let registry = CatalogRegistry::default()
            .register(CatalogSpec::load_once(CatalogId::new("regions")))
            .register(CatalogSpec::bounded(
                CatalogId::new("insurers"),
                Duration::from_secs(3600),
            ));
        ReferenceStore::new(CacheConfig::new().with_registry(registry))
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::for_catalog(&CatalogId::new(name), None)
    }

    #[tokio::test]
    async fn round_trip_restores_fresh_entries() {
        let source = store();
        source
            .put(key("regions"), vec![OptionItem::new("SP", "São Paulo")])
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refdata.json");
        Snapshot::capture(&source).await.save(&path).unwrap();

        let target = store();
        let admitted = Snapshot::read(&path).unwrap().restore(&target).await;
        assert_eq!(admitted, 1);
        let entry = target.get(&key("regions")).await.unwrap();
        assert_eq!(entry.items[0].id, "SP");
    }

    #[tokio::test]
    async fn restore_drops_entries_outside_their_window() {
        let source = store();
        source.put(key("insurers"), vec![]).await;

        let mut snapshot = Snapshot::capture(&source).await;
        // Age the insurers entry past its 1-hour window.
        if let Some(entry) = snapshot.entries.get_mut(&key("insurers")) {
            entry.fetched_at = Utc::now() - chrono::Duration::hours(2);
        }

        let target = store();
        assert_eq!(snapshot.restore(&target).await, 0);
    }

    #[tokio::test]
    async fn restore_drops_entries_saved_under_an_older_version() {
        let source = store();
        source.put(key("regions"), vec![]).await;
        let snapshot = Snapshot::capture(&source).await;

        let target = store();
        // The target has seen an invalidation the snapshot predates.
        target.invalidate_all().await;
        assert_eq!(snapshot.restore(&target).await, 0);
    }

    #[test]
    fn read_reports_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refdata.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            Snapshot::read(&path),
            Err(SnapshotError::Malformed { .. })
        ));
    }
}
