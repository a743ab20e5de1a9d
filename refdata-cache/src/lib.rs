//! Reference-data cache with explicit staleness contracts.
//!
//! This crate implements the shared cache behind the application's select
//! controls: an in-memory keyed store ([`ReferenceStore`]), a pure
//! staleness classifier ([`policy::classify`]), and a load coordinator that
//! deduplicates concurrent fetches for the same key and supports logical
//! supersession when a dependent parent changes mid-flight
//! ([`LoadCoordinator`]).
//!
//! # Design Philosophy
//!
//! Staleness is never hidden: every read decision goes through
//! [`policy::classify`], which compares an entry's policy-version tag and
//! age against the catalog's declared freshness window. Invalidation is
//! either targeted (`invalidate`) or global (`invalidate_all`, which bumps
//! the policy version so survivors of any race classify stale on the next
//! lookup).
//!
//! # Concurrency
//!
//! Both the store and the in-flight table are single-writer-per-key.
//! Mutation is always read-snapshot, compute, write-once: readers never
//! observe a half-written entry. Supersession is logical - a superseded
//! fetch runs to completion but its result is discarded.

pub mod coordinator;
pub mod policy;
pub mod snapshot;
pub mod store;

pub use coordinator::{CatalogFetcher, LoadCoordinator};
pub use policy::{classify, Classification};
pub use snapshot::Snapshot;
pub use store::{CacheConfig, ReferenceStore, StoreStats};
