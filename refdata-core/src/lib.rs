//! REFDATA Core - Data Types
//!
//! Pure data structures for the reference-data cache layer. All other
//! crates depend on this. This crate contains ONLY data types and their
//! constructors - no caching or selection logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod catalog;
pub mod error;

pub use catalog::{CatalogRegistry, CatalogSpec, FreshnessWindow};
pub use error::{FetchError, LoadError, RefdataError, RefdataResult, SnapshotError};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// CATALOG ENTRIES
// ============================================================================

/// One entry of a reference catalog, as served to a select control.
///
/// `id` is unique within a catalog by invariant; `label` is unique only by
/// convention. Insertion order is presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub id: String,
    /// Display text. The upstream resource layer calls this field `name`.
    #[serde(alias = "name")]
    pub label: String,
}

impl OptionItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Shared, immutable option set. Cloning is a refcount bump; a resolved set
/// is never mutated in place.
pub type OptionSet = Arc<[OptionItem]>;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Name of a reference catalog (`regions`, `insurers`, `brands`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(String);

impl CatalogId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatalogId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Cache key scoping a catalog to an optional parent selection.
///
/// # Design
///
/// A key can ONLY be constructed through [`CacheKey::for_catalog`], which
/// embeds the parent id verbatim after a `:parent=` marker. Two distinct
/// parent values therefore always produce two distinct keys - dependent
/// loads for different parents can never alias. Keys compare by string
/// equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a catalog, optionally scoped to a parent selection.
    pub fn for_catalog(catalog: &CatalogId, parent: Option<&str>) -> Self {
        match parent {
            Some(p) => Self(format!("{}:parent={}", catalog.as_str(), p)),
            None => Self(catalog.as_str().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Catalog portion of the key, without any parent scope.
    pub fn catalog_name(&self) -> &str {
        match self.0.split_once(":parent=") {
            Some((catalog, _)) => catalog,
            None => &self.0,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonically increasing tag used to invalidate every cache entry at
/// once without enumerating keys. Only ever incremented.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PolicyVersion(pub u64);

impl PolicyVersion {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ============================================================================
// CACHE ENTRY
// ============================================================================

/// One populated cache slot: the resolved option set plus the metadata the
/// staleness policy needs.
///
/// An entry is written exactly once per fetch cycle (single assignment after
/// the fetch settles); readers never observe a half-written entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub items: OptionSet,
    pub fetched_at: Timestamp,
    pub version: PolicyVersion,
}

impl CacheEntry {
    pub fn new(items: Vec<OptionItem>, fetched_at: Timestamp, version: PolicyVersion) -> Self {
        Self {
            items: items.into(),
            fetched_at,
            version,
        }
    }

    /// Age of this entry relative to `now`. Zero if the clock went backwards.
    pub fn age(&self, now: Timestamp) -> std::time::Duration {
        now.signed_duration_since(self.fetched_at)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_without_parent_is_bare_catalog_name() {
        let key = CacheKey::for_catalog(&CatalogId::new("regions"), None);
        assert_eq!(key.as_str(), "regions");
    }

    #[test]
    fn cache_key_embeds_parent_verbatim() {
        let key = CacheKey::for_catalog(&CatalogId::new("localities"), Some("SP"));
        assert_eq!(key.as_str(), "localities:parent=SP");
    }

    #[test]
    fn distinct_parents_never_alias() {
        let catalog = CatalogId::new("localities");
        let sp = CacheKey::for_catalog(&catalog, Some("SP"));
        let rj = CacheKey::for_catalog(&catalog, Some("RJ"));
        assert_ne!(sp, rj);
    }

    #[test]
    fn policy_version_is_monotonic() {
        let v = PolicyVersion::zero();
        assert!(v.next() > v);
        assert!(v.next().next() > v.next());
    }

    #[test]
    fn option_item_accepts_upstream_name_field() {
        let item: OptionItem = serde_json::from_str(r#"{"id":"1","name":"Azul Seguros"}"#).unwrap();
        assert_eq!(item.label, "Azul Seguros");
    }

    #[test]
    fn entry_age_is_zero_for_future_timestamps() {
        let now = Utc::now();
        let entry = CacheEntry::new(vec![], now + chrono::Duration::seconds(30), PolicyVersion(1));
        assert_eq!(entry.age(now), std::time::Duration::ZERO);
    }
}
