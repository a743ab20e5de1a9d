//! Subscription surface for plain (non-dependent) dropdowns.
//!
//! A form binds a select control to an [`OptionsHandle`], a watch-channel
//! subscription that moves from `loading` to either resolved options or a
//! surfaced fetch error. Handles for the same key share the cache and the
//! in-flight load behind the coordinator.
//!
//! [`CatalogService`] also carries the two integration points with the
//! surrounding CRUD layer: targeted invalidation after a successful
//! catalog mutation, and the full `clear_cache` used on logout.

use std::sync::Arc;

use refdata_cache::{CatalogFetcher, LoadCoordinator, ReferenceStore, StoreStats};
use refdata_core::{CacheKey, CatalogId, FetchError, LoadError, OptionSet};
use tokio::sync::watch;

/// What a bound select control sees at any instant.
#[derive(Debug, Clone)]
pub struct OptionsState {
    pub options: OptionSet,
    pub loading: bool,
    pub error: Option<FetchError>,
}

impl OptionsState {
    fn loading() -> Self {
        Self {
            options: Vec::new().into(),
            loading: true,
            error: None,
        }
    }

    fn ready(options: OptionSet) -> Self {
        Self {
            options,
            loading: false,
            error: None,
        }
    }

    fn failed(error: FetchError) -> Self {
        Self {
            options: Vec::new().into(),
            loading: false,
            error: Some(error),
        }
    }
}

/// One form field's subscription to a catalog's options.
#[derive(Debug)]
pub struct OptionsHandle {
    rx: watch::Receiver<OptionsState>,
}

impl OptionsHandle {
    /// Snapshot of the current state.
    pub fn current(&self) -> OptionsState {
        self.rx.borrow().clone()
    }

    /// Wait for the next state transition. Returns false once the
    /// publisher is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the subscription leaves its loading state.
    pub async fn settled(&mut self) -> OptionsState {
        loop {
            let state = self.rx.borrow().clone();
            if !state.loading {
                return state;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}

/// Shared service owning the store and coordinator for one application
/// session. Constructed at app start; `clear_cache` on logout.
pub struct CatalogService<F: CatalogFetcher> {
    store: Arc<ReferenceStore>,
    coordinator: Arc<LoadCoordinator<F>>,
}

impl<F: CatalogFetcher + 'static> CatalogService<F> {
    pub fn new(store: Arc<ReferenceStore>, fetcher: Arc<F>) -> Self {
        let coordinator = Arc::new(LoadCoordinator::new(Arc::clone(&store), fetcher));
        Self { store, coordinator }
    }

    pub fn store(&self) -> &Arc<ReferenceStore> {
        &self.store
    }

    /// Coordinator handle for dependent-selection controllers owned by
    /// forms of this session.
    pub fn coordinator(&self) -> Arc<LoadCoordinator<F>> {
        Arc::clone(&self.coordinator)
    }

    /// Subscribe a control to a catalog's options.
    ///
    /// The handle starts in `loading` and transitions once the shared load
    /// settles. A superseded load publishes nothing - the subscription for
    /// the replacement key carries the live state.
    pub fn subscribe(&self, catalog: &CatalogId, parent: Option<&str>) -> OptionsHandle {
        let (tx, rx) = watch::channel(OptionsState::loading());
        let coordinator = Arc::clone(&self.coordinator);
        let catalog = catalog.clone();
        let parent = parent.map(str::to_owned);

        tokio::spawn(async move {
            match coordinator.load(&catalog, parent.as_deref()).await {
                Ok(options) => {
                    let _ = tx.send(OptionsState::ready(options));
                }
                Err(LoadError::Fetch(err)) => {
                    let _ = tx.send(OptionsState::failed(err));
                }
                Err(LoadError::Superseded { .. }) => {}
            }
        });

        OptionsHandle { rx }
    }

    /// CRUD-layer integration point: call after a successful mutation of a
    /// catalog (create/update/delete of a brand, insurer, position, ...).
    /// Sweeps every key of the catalog, parent-scoped ones included.
    pub async fn invalidate(&self, catalog: &CatalogId) {
        self.store.invalidate_catalog(catalog).await;
    }

    /// Targeted single-key invalidation.
    pub async fn invalidate_key(&self, key: &CacheKey) {
        self.store.invalidate(key).await;
    }

    /// Full invalidation: logout or an explicit cache-reset action.
    pub async fn clear_cache(&self) {
        self.store.invalidate_all().await;
    }

    /// Read-only diagnostics for the operational debug panel.
    pub async fn cache_stats(&self) -> StoreStats {
        self.store.stats().await
    }
}
