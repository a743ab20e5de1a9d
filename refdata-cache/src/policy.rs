//! Staleness & version policy.
//!
//! A single pure function decides whether a stored entry may be served.
//! Keeping the decision out of the store makes it trivially idempotent and
//! lets the snapshot loader reuse the exact same check.

use refdata_core::{CacheEntry, FreshnessWindow, PolicyVersion, Timestamp};

/// Outcome of classifying a cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Entry exists, carries the live policy version, and is within its
    /// catalog's freshness window. Serve it.
    Fresh,
    /// Entry exists but its version tag is outdated or it has outlived its
    /// window. Re-fetch.
    Stale,
    /// No entry for this key.
    Absent,
}

impl Classification {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// Classify a cache slot against the live policy.
///
/// Pure: same inputs, same answer, no side effects. The version check is
/// evaluated first so that a global invalidation (version bump) marks every
/// surviving entry stale regardless of age; load-once windows never expire
/// by age.
pub fn classify(
    entry: Option<&CacheEntry>,
    now: Timestamp,
    current_version: PolicyVersion,
    window: FreshnessWindow,
) -> Classification {
    let Some(entry) = entry else {
        return Classification::Absent;
    };
    if entry.version != current_version {
        return Classification::Stale;
    }
    if window.expired(entry.age(now)) {
        return Classification::Stale;
    }
    Classification::Fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use refdata_core::OptionItem;
    use std::time::Duration;

    fn entry(age_secs: i64, version: u64) -> CacheEntry {
        CacheEntry::new(
            vec![OptionItem::new("1", "one")],
            Utc::now() - chrono::Duration::seconds(age_secs),
            PolicyVersion(version),
        )
    }

    #[test]
    fn absent_when_no_entry() {
        let got = classify(
            None,
            Utc::now(),
            PolicyVersion(0),
            FreshnessWindow::LoadOnce,
        );
        assert_eq!(got, Classification::Absent);
    }

    #[test]
    fn fresh_within_window_and_version() {
        let e = entry(10, 3);
        let got = classify(
            Some(&e),
            Utc::now(),
            PolicyVersion(3),
            FreshnessWindow::Bounded(Duration::from_secs(60)),
        );
        assert_eq!(got, Classification::Fresh);
    }

    #[test]
    fn stale_on_version_mismatch_regardless_of_age() {
        let e = entry(0, 3);
        let got = classify(
            Some(&e),
            Utc::now(),
            PolicyVersion(4),
            FreshnessWindow::LoadOnce,
        );
        assert_eq!(got, Classification::Stale);
    }

    #[test]
    fn stale_past_bounded_window() {
        let e = entry(120, 0);
        let got = classify(
            Some(&e),
            Utc::now(),
            PolicyVersion(0),
            FreshnessWindow::Bounded(Duration::from_secs(60)),
        );
        assert_eq!(got, Classification::Stale);
    }

    #[test]
    fn load_once_never_ages_out() {
        let e = entry(10_000_000, 0);
        let got = classify(
            Some(&e),
            Utc::now(),
            PolicyVersion(0),
            FreshnessWindow::LoadOnce,
        );
        assert_eq!(got, Classification::Fresh);
    }

    proptest! {
        /// Classification is a pure function: evaluating it twice with the
        /// same inputs yields the same answer.
        #[test]
        fn classify_is_idempotent(
            age_secs in 0i64..1_000_000,
            entry_version in 0u64..10,
            live_version in 0u64..10,
            window_secs in prop::option::of(0u64..1_000_000),
        ) {
            let e = entry(age_secs, entry_version);
            let now = Utc::now();
            let window = match window_secs {
                Some(s) => FreshnessWindow::Bounded(Duration::from_secs(s)),
                None => FreshnessWindow::LoadOnce,
            };
            let first = classify(Some(&e), now, PolicyVersion(live_version), window);
            let second = classify(Some(&e), now, PolicyVersion(live_version), window);
            prop_assert_eq!(first, second);
        }

        /// A version bump marks every entry stale, whatever its age.
        #[test]
        fn version_bump_is_monotonic_staleness(
            age_secs in 0i64..1_000_000,
            version in 0u64..100,
        ) {
            let e = entry(age_secs, version);
            let bumped = PolicyVersion(version + 1);
            let got = classify(Some(&e), Utc::now(), bumped, FreshnessWindow::LoadOnce);
            prop_assert_eq!(got, Classification::Stale);
        }
    }
}
