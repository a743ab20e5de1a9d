//! Error types for refdata operations

use crate::{CacheKey, CatalogId};
use thiserror::Error;

/// Result alias used across the refdata crates.
pub type RefdataResult<T> = Result<T, RefdataError>;

/// Transport or server failure surfaced by the resource collaborator.
///
/// Clone-able so a single failed fetch can settle every caller joined on
/// the same in-flight load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Fetch failed for catalog {catalog}: {reason}")]
pub struct FetchError {
    pub catalog: CatalogId,
    pub reason: String,
}

impl FetchError {
    pub fn new(catalog: impl Into<CatalogId>, reason: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome channel of the load coordinator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The underlying fetch failed. Propagates to the owning form's error
    /// channel; never cached.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The load was superseded by a parent-selection change before it
    /// settled. Internal signal only - never user-facing.
    #[error("Load superseded for key {key}")]
    Superseded { key: CacheKey },
}

impl LoadError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

/// Persisted-snapshot errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot malformed at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Umbrella error for the refdata crates.
#[derive(Debug, Error)]
pub enum RefdataError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl From<FetchError> for RefdataError {
    fn from(err: FetchError) -> Self {
        Self::Load(LoadError::Fetch(err))
    }
}
