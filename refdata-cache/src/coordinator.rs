//! Load coordinator.
//!
//! Routes every catalog read through the staleness policy, deduplicates
//! concurrent fetches for the same key (join, don't duplicate), and
//! supports logical supersession: when a dependent parent changes before
//! the child load settles, the old load's eventual result is discarded
//! without aborting the network call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use refdata_core::{CacheKey, CatalogId, FetchError, LoadError, OptionItem, OptionSet};
use tokio::sync::{broadcast, Mutex};

use crate::policy::classify;
use crate::store::ReferenceStore;

/// Boundary to the surrounding CRUD layer's resource endpoints.
///
/// Implementations must reject with `Err` on transport or server failure -
/// never resolve with an empty or error-shaped success payload - so the
/// coordinator's failure path triggers correctly.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    async fn fetch(
        &self,
        catalog: &CatalogId,
        parent: Option<&str>,
    ) -> Result<Vec<OptionItem>, FetchError>;
}

/// Settlement broadcast to every caller joined on one fetch cycle.
type LoadOutcome = Result<OptionSet, LoadError>;

/// At most one of these exists per key at any time.
struct InFlight {
    /// Tags the fetch cycle; a settling fetch whose epoch no longer
    /// matches the table has been superseded and must not touch the store.
    epoch: u64,
    tx: broadcast::Sender<LoadOutcome>,
}

/// Deduplicating, supersession-aware front door to the reference store.
pub struct LoadCoordinator<F: CatalogFetcher> {
    store: Arc<ReferenceStore>,
    fetcher: Arc<F>,
    in_flight: Arc<Mutex<HashMap<CacheKey, InFlight>>>,
    epochs: AtomicU64,
}

impl<F: CatalogFetcher + 'static> LoadCoordinator<F> {
    pub fn new(store: Arc<ReferenceStore>, fetcher: Arc<F>) -> Self {
        Self {
            store,
            fetcher,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            epochs: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<ReferenceStore> {
        &self.store
    }

    /// Load the option set for a catalog, optionally scoped to a parent
    /// selection.
    ///
    /// Fresh cache entries are served without a fetch. A miss or stale
    /// entry either joins the key's in-flight fetch or starts one; all
    /// callers joined on the same cycle observe the same settlement.
    /// Failures are never cached - the next call re-fetches.
    pub async fn load(
        &self,
        catalog: &CatalogId,
        parent: Option<&str>,
    ) -> Result<OptionSet, LoadError> {
        let key = CacheKey::for_catalog(catalog, parent);
        let window = self.store.window(catalog);
        let entry = self.store.get(&key).await;
        let classification = classify(
            entry.as_ref(),
            Utc::now(),
            self.store.current_version(),
            window,
        );

        if classification.is_fresh() {
            self.store.record_hit();
            tracing::debug!(key = %key, "cache hit");
            // entry is Some by classification
            if let Some(entry) = entry {
                return Ok(entry.items);
            }
        }
        self.store.record_miss();
        tracing::debug!(key = %key, ?classification, "cache miss, loading");

        let mut rx = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&key) {
                // Join the pending fetch instead of duplicating it.
                existing.tx.subscribe()
            } else {
                let (tx, rx) = broadcast::channel(1);
                let epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
                in_flight.insert(
                    key.clone(),
                    InFlight {
                        epoch,
                        tx: tx.clone(),
                    },
                );
                self.spawn_fetch(key.clone(), catalog.clone(), parent, epoch, tx);
                rx
            }
        };

        match rx.recv().await {
            Ok(outcome) => outcome,
            // The driving task never drops its sender before settling; a
            // closed channel means the runtime tore it down mid-flight.
            Err(_) => Err(LoadError::Fetch(FetchError::new(
                catalog.clone(),
                "in-flight load dropped before settling",
            ))),
        }
    }

    /// Discard the in-flight load for `key`, if any.
    ///
    /// Callers already joined observe [`LoadError::Superseded`]; the fetch
    /// itself runs to completion but settles into nothing - the store is
    /// not written. Loads requested after this call start a fresh cycle.
    pub async fn supersede(&self, key: &CacheKey) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(stale) = in_flight.remove(key) {
            tracing::debug!(key = %key, epoch = stale.epoch, "in-flight load superseded");
            let _ = stale.tx.send(Err(LoadError::Superseded { key: key.clone() }));
        }
    }

    fn spawn_fetch(
        &self,
        key: CacheKey,
        catalog: CatalogId,
        parent: Option<&str>,
        epoch: u64,
        tx: broadcast::Sender<LoadOutcome>,
    ) {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let in_flight = Arc::clone(&self.in_flight);
        let parent = parent.map(str::to_owned);

        tokio::spawn(async move {
            let result = fetcher.fetch(&catalog, parent.as_deref()).await;

            let mut table = in_flight.lock().await;
            let current = matches!(table.get(&key), Some(record) if record.epoch == epoch);
            if !current {
                // Superseded while fetching; waiters were already settled
                // and the store must stay untouched.
                tracing::debug!(key = %key, epoch, "discarding superseded fetch result");
                return;
            }

            let outcome = match result {
                Ok(items) => {
                    let set = store.put(key.clone(), items).await;
                    Ok(set)
                }
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "catalog fetch failed");
                    Err(LoadError::Fetch(err))
                }
            };
            table.remove(&key);
            drop(table);
            let _ = tx.send(outcome);
        });
    }
}
