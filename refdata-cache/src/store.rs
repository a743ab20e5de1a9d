//! In-memory reference store.
//!
//! A keyed table of resolved option sets plus the policy-version counter.
//! The store is a dependency-injected instance with an explicit lifecycle
//! (constructed at app start, cleared on logout), never a module-level
//! singleton.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use refdata_core::{
    CacheEntry, CacheKey, CatalogId, CatalogRegistry, FreshnessWindow, OptionItem, OptionSet,
    PolicyVersion,
};
use tokio::sync::RwLock;

/// Configuration for the reference store.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Per-catalog freshness windows, with a default for unregistered
    /// catalogs.
    pub registry: CatalogRegistry,
    /// Where to persist the restart-survival snapshot, if anywhere.
    pub snapshot_path: Option<PathBuf>,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: CatalogRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

/// Statistics about store usage, for the operational debug panel.
///
/// Read-only; no behavioral effect.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub entry_count: usize,
    pub hits: u64,
    pub misses: u64,
    /// Age of every resident entry, keyed for the debug surface.
    pub per_key_age: Vec<(CacheKey, Duration)>,
}

impl StoreStats {
    /// Hit rate since the last counter reset (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// In-memory, persisted-snapshot-backed keyed store.
///
/// Writes are single-assignment: an entry is replaced wholesale with a
/// fresh timestamp and the live policy version, never patched. The policy
/// version counter only ever increments, so staleness checks are monotonic
/// and safe to evaluate without holding the table lock.
#[derive(Debug)]
pub struct ReferenceStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    version: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    config: CacheConfig,
}

impl ReferenceStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            version: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Freshness window for a catalog, from the configured registry.
    pub fn window(&self, catalog: &CatalogId) -> FreshnessWindow {
        self.config.registry.window(catalog)
    }

    /// Live policy version.
    pub fn current_version(&self) -> PolicyVersion {
        PolicyVersion(self.version.load(Ordering::Acquire))
    }

    /// Pure lookup. No counter bumps, no other side effects; the load
    /// coordinator records hit/miss after classification.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Overwrite the entry for `key` with freshly fetched items, stamped
    /// with `now` and the live policy version. Returns the shared option
    /// set so all waiters on the fetch observe the same allocation.
    pub async fn put(&self, key: CacheKey, items: Vec<OptionItem>) -> OptionSet {
        let entry = CacheEntry::new(items, Utc::now(), self.current_version());
        let set = entry.items.clone();
        self.entries.write().await.insert(key, entry);
        set
    }

    /// Remove a single entry.
    pub async fn invalidate(&self, key: &CacheKey) {
        if self.entries.write().await.remove(key).is_some() {
            tracing::debug!(key = %key, "cache entry invalidated");
        }
    }

    /// Remove every entry belonging to a catalog, including all
    /// parent-scoped keys.
    pub async fn invalidate_catalog(&self, catalog: &CatalogId) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.catalog_name() != catalog.as_str());
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(catalog = %catalog, removed, "catalog entries invalidated");
        }
    }

    /// Clear every entry AND bump the policy version, so that any entry
    /// surviving a race with this call still classifies stale on its next
    /// lookup.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        let bumped = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(version = bumped, "reference store cleared");
    }

    /// Snapshot-capture path: copy of the whole table.
    pub(crate) async fn dump(&self) -> HashMap<CacheKey, CacheEntry> {
        self.entries.read().await.clone()
    }

    /// Snapshot-restore path: admit an already-classified entry.
    pub(crate) async fn restore_entry(&self, key: CacheKey, entry: CacheEntry) {
        self.entries.write().await.insert(key, entry);
    }

    /// Snapshot-restore path: fast-forward the policy version. Never
    /// rewinds.
    pub(crate) fn adopt_version(&self, version: PolicyVersion) {
        self.version.fetch_max(version.0, Ordering::AcqRel);
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Observability snapshot for the debug surface.
    pub async fn stats(&self) -> StoreStats {
        let entries = self.entries.read().await;
        let now = Utc::now();
        let mut per_key_age: Vec<(CacheKey, Duration)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.age(now)))
            .collect();
        per_key_age.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        StoreStats {
            entry_count: entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            per_key_age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{classify, Classification};
    use refdata_core::CatalogSpec;

    fn store() -> ReferenceStore {
        ReferenceStore::new(CacheConfig::new().with_registry(
            CatalogRegistry::default().register(CatalogSpec::load_once(CatalogId::new("regions"))),
        ))
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::for_catalog(&CatalogId::new(name), None)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = store();
        let k = key("regions");
        store
            .put(k.clone(), vec![OptionItem::new("SP", "São Paulo")])
            .await;

        let entry = store.get(&k).await.unwrap();
        assert_eq!(entry.items.len(), 1);
        assert_eq!(entry.version, store.current_version());
    }

    #[tokio::test]
    async fn get_is_pure_for_missing_keys() {
        let store = store();
        assert!(store.get(&key("brands")).await.is_none());
        assert_eq!(store.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn invalidate_removes_only_the_named_key() {
        let store = store();
        store.put(key("regions"), vec![]).await;
        store.put(key("brands"), vec![]).await;

        store.invalidate(&key("regions")).await;
        assert!(store.get(&key("regions")).await.is_none());
        assert!(store.get(&key("brands")).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_catalog_sweeps_parent_scoped_keys() {
        let store = store();
        let localities = CatalogId::new("localities");
        store
            .put(CacheKey::for_catalog(&localities, Some("SP")), vec![])
            .await;
        store
            .put(CacheKey::for_catalog(&localities, Some("RJ")), vec![])
            .await;
        store.put(key("regions"), vec![]).await;

        store.invalidate_catalog(&localities).await;
        assert_eq!(store.stats().await.entry_count, 1);
        assert!(store.get(&key("regions")).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_all_bumps_version_so_survivors_classify_stale() {
        let store = store();
        let k = key("regions");
        store.put(k.clone(), vec![]).await;
        let entry = store.get(&k).await.unwrap();

        store.invalidate_all().await;

        // Even an entry captured before the clear is stale under the new
        // version, whatever its age.
        let got = classify(
            Some(&entry),
            Utc::now(),
            store.current_version(),
            FreshnessWindow::LoadOnce,
        );
        assert_eq!(got, Classification::Stale);
        assert_eq!(store.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn stats_report_ages_and_hit_rate() {
        let store = store();
        store.put(key("regions"), vec![]).await;
        store.record_hit();
        store.record_hit();
        store.record_miss();

        let stats = store.stats().await;
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.per_key_age.len(), 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn adopt_version_never_rewinds() {
        let store = store();
        store.invalidate_all().await;
        store.invalidate_all().await;
        let live = store.current_version();

        store.adopt_version(PolicyVersion(1));
        assert_eq!(store.current_version(), live);

        store.adopt_version(PolicyVersion(live.0 + 5));
        assert_eq!(store.current_version(), PolicyVersion(live.0 + 5));
    }
}
