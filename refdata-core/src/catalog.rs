//! Per-catalog freshness policy.
//!
//! Every catalog declares how long a cached copy may be trusted. Static
//! reference lists (geographic subdivisions, fixed enumerations) are
//! load-once: only a policy-version bump invalidates them. Catalogs subject
//! to administrative edit carry a bounded window as a safety net on top of
//! explicit invalidation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::CatalogId;

/// Staleness tolerance for one catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreshnessWindow {
    /// Entry expires once its age exceeds the given duration, in addition
    /// to the policy-version check.
    Bounded(Duration),
    /// Entry never expires by age; only a policy-version mismatch makes it
    /// stale.
    LoadOnce,
}

impl FreshnessWindow {
    /// Returns true if an entry of the given age has outlived this window.
    pub fn expired(&self, age: Duration) -> bool {
        match self {
            Self::Bounded(window) => age > *window,
            Self::LoadOnce => false,
        }
    }

    pub fn is_load_once(&self) -> bool {
        matches!(self, Self::LoadOnce)
    }
}

/// Policy record for one catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub id: CatalogId,
    pub freshness: FreshnessWindow,
    /// For dependent catalogs, the catalog whose selection scopes this one
    /// (e.g. `localities` depends on `regions`).
    pub dependent_on: Option<CatalogId>,
}

impl CatalogSpec {
    pub fn load_once(id: impl Into<CatalogId>) -> Self {
        Self {
            id: id.into(),
            freshness: FreshnessWindow::LoadOnce,
            dependent_on: None,
        }
    }

    pub fn bounded(id: impl Into<CatalogId>, window: Duration) -> Self {
        Self {
            id: id.into(),
            freshness: FreshnessWindow::Bounded(window),
            dependent_on: None,
        }
    }

    pub fn dependent_on(mut self, parent: impl Into<CatalogId>) -> Self {
        self.dependent_on = Some(parent.into());
        self
    }
}

/// Registry of catalog specs with a default window for unregistered
/// catalogs.
#[derive(Debug, Clone)]
pub struct CatalogRegistry {
    specs: HashMap<CatalogId, CatalogSpec>,
    default_window: FreshnessWindow,
}

impl CatalogRegistry {
    pub fn new(default_window: FreshnessWindow) -> Self {
        Self {
            specs: HashMap::new(),
            default_window,
        }
    }

    pub fn register(mut self, spec: CatalogSpec) -> Self {
        self.specs.insert(spec.id.clone(), spec);
        self
    }

    pub fn spec(&self, catalog: &CatalogId) -> Option<&CatalogSpec> {
        self.specs.get(catalog)
    }

    /// Freshness window for a catalog, falling back to the registry default.
    pub fn window(&self, catalog: &CatalogId) -> FreshnessWindow {
        self.specs
            .get(catalog)
            .map(|s| s.freshness)
            .unwrap_or(self.default_window)
    }
}

impl Default for CatalogRegistry {
    /// 24-hour bounded window by default, the safety net for catalogs
    /// subject to administrative edit.
    fn default() -> Self {
        Self::new(FreshnessWindow::Bounded(Duration::from_secs(24 * 60 * 60)))
    }
}
