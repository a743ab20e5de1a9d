//! Dependent-selection controller.
//!
//! Drives one parent → child cascade (e.g. region → locality) for one open
//! form. On every parent change the previous child load is superseded, the
//! child's committed value is cleared, and a fresh load is issued under a
//! bumped generation; any load settling under an older generation is
//! discarded without touching the form's state.

use std::sync::Arc;

use refdata_cache::{CatalogFetcher, LoadCoordinator};
use refdata_core::{CacheKey, CatalogId, FetchError, LoadError, OptionSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::binding::SelectionBinding;

/// State of the child field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    /// No parent selected; child disabled, options empty.
    Idle,
    /// Parent set or changed; the child load is in flight.
    Loading,
    /// Child options resolved for the current parent; child enabled.
    Ready(OptionSet),
    /// The child load failed. The child stays disabled with the surfaced
    /// error rather than silently becoming an empty Ready - the user must
    /// be able to tell "no data" from "load failed".
    Failed(FetchError),
}

impl SelectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

struct Inner {
    state: SelectionState,
    parent: Option<String>,
    /// Bumped on every parent change or retry; a load result tagged with
    /// an older generation is stale and must be ignored.
    generation: u64,
    binding: SelectionBinding,
}

/// One controller per dependent pair per open form instance. Never shared
/// across forms; only the cache entries behind the coordinator are.
pub struct DependentSelectionController<F: CatalogFetcher> {
    form_id: Uuid,
    child_catalog: CatalogId,
    coordinator: Arc<LoadCoordinator<F>>,
    inner: Mutex<Inner>,
}

impl<F: CatalogFetcher + 'static> DependentSelectionController<F> {
    pub fn new(child_catalog: CatalogId, coordinator: Arc<LoadCoordinator<F>>) -> Self {
        Self::with_binding(child_catalog, coordinator, SelectionBinding::new())
    }

    /// Controller for an edit flow, seeded with the child value the record
    /// was saved with.
    pub fn for_edit(
        child_catalog: CatalogId,
        coordinator: Arc<LoadCoordinator<F>>,
        original_child_value: impl Into<String>,
    ) -> Self {
        Self::with_binding(
            child_catalog,
            coordinator,
            SelectionBinding::with_original(original_child_value),
        )
    }

    fn with_binding(
        child_catalog: CatalogId,
        coordinator: Arc<LoadCoordinator<F>>,
        binding: SelectionBinding,
    ) -> Self {
        Self {
            form_id: Uuid::now_v7(),
            child_catalog,
            coordinator,
            inner: Mutex::new(Inner {
                state: SelectionState::Idle,
                parent: None,
                generation: 0,
                binding,
            }),
        }
    }

    pub fn form_id(&self) -> Uuid {
        self.form_id
    }

    fn child_key(&self, parent: &str) -> CacheKey {
        CacheKey::for_catalog(&self.child_catalog, Some(parent))
    }

    /// Apply a parent selection change.
    ///
    /// Clears the child's committed value, supersedes any in-flight load
    /// for the previous parent's key, and - for a non-empty parent -
    /// issues the child load. A fetch failure is surfaced to the caller
    /// (the form's error channel); a superseded load resolves to `Ok`
    /// because a newer selection owns the outcome.
    pub async fn select_parent(&self, parent: Option<String>) -> Result<(), FetchError> {
        let (generation, superseded_key) = {
            let mut inner = self.inner.lock().await;
            let superseded_key = inner.parent.as_deref().map(|p| self.child_key(p));
            inner.parent = parent.clone();
            inner.binding.clear_committed();
            inner.generation += 1;
            inner.state = match &parent {
                None => SelectionState::Idle,
                Some(_) => SelectionState::Loading,
            };
            (inner.generation, superseded_key)
        };

        if let Some(key) = superseded_key {
            self.coordinator.supersede(&key).await;
        }

        match parent {
            None => Ok(()),
            Some(p) => {
                tracing::debug!(form = %self.form_id, parent = %p, "child load issued");
                self.run_load(generation, &p).await
            }
        }
    }

    /// Re-issue the load for the current parent after a failure. No-op
    /// when no parent is selected.
    pub async fn retry(&self) -> Result<(), FetchError> {
        let (generation, parent) = {
            let mut inner = self.inner.lock().await;
            let Some(parent) = inner.parent.clone() else {
                return Ok(());
            };
            inner.generation += 1;
            inner.state = SelectionState::Loading;
            (inner.generation, parent)
        };
        self.run_load(generation, &parent).await
    }

    async fn run_load(&self, generation: u64, parent: &str) -> Result<(), FetchError> {
        let result = self.coordinator.load(&self.child_catalog, Some(parent)).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            // A newer parent selection owns the state now.
            tracing::debug!(form = %self.form_id, generation, "stale child load discarded");
            return Ok(());
        }
        match result {
            Ok(options) => {
                inner.binding.restore_original_if_present(&options);
                inner.state = SelectionState::Ready(options);
                Ok(())
            }
            Err(LoadError::Superseded { .. }) => Ok(()),
            Err(LoadError::Fetch(err)) => {
                inner.state = SelectionState::Failed(err.clone());
                Err(err)
            }
        }
    }

    pub async fn state(&self) -> SelectionState {
        self.inner.lock().await.state.clone()
    }

    pub async fn parent(&self) -> Option<String> {
        self.inner.lock().await.parent.clone()
    }

    /// The child control is interactive only once its options resolved.
    pub async fn child_enabled(&self) -> bool {
        self.inner.lock().await.state.is_ready()
    }

    /// Resolved options, empty unless Ready.
    pub async fn options(&self) -> OptionSet {
        match &self.inner.lock().await.state {
            SelectionState::Ready(options) => options.clone(),
            _ => Vec::new().into(),
        }
    }

    /// Render-time child value, projected through the safe-selection
    /// guard against the current options.
    pub async fn display_value(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        match &inner.state {
            SelectionState::Ready(options) => {
                inner.binding.display(options).map(str::to_owned)
            }
            _ => None,
        }
    }

    /// The committed (form-model) child value. Unlike the displayed value
    /// this is never coerced by a refresh.
    pub async fn committed_value(&self) -> Option<String> {
        self.inner.lock().await.binding.committed().map(str::to_owned)
    }

    pub async fn user_select(&self, value: impl Into<String>) {
        self.inner.lock().await.binding.user_select(value);
    }

    pub async fn user_clear(&self) {
        self.inner.lock().await.binding.user_clear();
    }
}
