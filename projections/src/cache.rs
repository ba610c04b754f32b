//! In-memory cache of projection versions.
//!
//! The cache is the only shared mutable state in the repository. It maps
//! projection names to their current [`ProjectionVersions`] and carries a
//! single refresh timestamp that rate-limits replays of the version-manager
//! projection: one timestamp for the whole cache, not one per name, so a
//! refresh of any name postpones the next refresh of every name.
//!
//! Readers take the shared lock and receive cloned, immutable snapshots of
//! the version set; writers serialize on the exclusive lock. Entries are
//! never evicted by a failed refresh - stale reads are preferred over
//! unavailability.

use statefold_core::name::ProjectionName;
use statefold_core::version::{ProjectionVersion, ProjectionVersions};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Per-process map `projection name → versions` with a refresh timestamp.
#[derive(Debug, Default)]
pub struct VersionCache {
    entries: RwLock<HashMap<ProjectionName, ProjectionVersions>>,
    last_refresh: RwLock<Option<Instant>>,
}

impl VersionCache {
    /// Create an empty cache that has never been refreshed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached versions for a name, if any.
    #[must_use]
    #[allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking writer
    pub fn get(&self, name: &ProjectionName) -> Option<ProjectionVersions> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Upsert a single version into its name's entry.
    #[allow(clippy::missing_panics_doc)]
    pub fn cache_version(&self, version: ProjectionVersion) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .entry(version.name().clone())
            .or_insert_with(|| ProjectionVersions::new(version.name().clone()))
            .apply(version);
    }

    /// Replace the whole entry for a name.
    #[allow(clippy::missing_panics_doc)]
    pub fn cache_versions(&self, versions: ProjectionVersions) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(versions.name().clone(), versions);
    }

    /// Time since the last successful refresh, or `None` if never refreshed.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn elapsed_since_refresh(&self) -> Option<Duration> {
        self.last_refresh
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .map(|at| at.elapsed())
    }

    /// Record a successful refresh now.
    #[allow(clippy::missing_panics_doc)]
    pub fn mark_refreshed(&self) {
        *self
            .last_refresh
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Instant::now());
    }

    /// Number of cached names.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statefold_core::hash::SchemaHash;
    use statefold_core::version::ProjectionStatus;

    fn version(revision: u64, status: ProjectionStatus) -> ProjectionVersion {
        ProjectionVersion::new(
            ProjectionName::new("orders"),
            status,
            revision,
            SchemaHash::new(9),
        )
    }

    #[test]
    fn miss_on_empty_cache() {
        let cache = VersionCache::new();
        assert!(cache.get(&ProjectionName::new("orders")).is_none());
        assert!(cache.elapsed_since_refresh().is_none());
    }

    #[test]
    fn cache_version_upserts() {
        let cache = VersionCache::new();
        cache.cache_version(version(1, ProjectionStatus::Live));
        cache.cache_version(version(2, ProjectionStatus::Building));

        #[allow(clippy::unwrap_used)]
        let versions = cache.get(&ProjectionName::new("orders")).unwrap();
        assert_eq!(versions.write_targets().len(), 2);
    }

    #[test]
    fn live_singleton_holds_across_upserts() {
        let cache = VersionCache::new();
        cache.cache_version(version(1, ProjectionStatus::Live));
        cache.cache_version(version(2, ProjectionStatus::Building));
        cache.cache_version(version(2, ProjectionStatus::Live));

        #[allow(clippy::unwrap_used)]
        let versions = cache.get(&ProjectionName::new("orders")).unwrap();
        let live: Vec<_> = versions
            .iter()
            .filter(|v| v.status() == ProjectionStatus::Live)
            .collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].revision(), 2);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let cache = VersionCache::new();
        cache.cache_version(version(1, ProjectionStatus::Live));
        assert!(cache.get(&ProjectionName::new("ORDERS")).is_some());
    }

    #[test]
    fn refresh_timestamp_advances() {
        let cache = VersionCache::new();
        assert!(cache.elapsed_since_refresh().is_none());
        cache.mark_refreshed();
        #[allow(clippy::unwrap_used)]
        let elapsed = cache.elapsed_since_refresh().unwrap();
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn replace_entry() {
        let cache = VersionCache::new();
        cache.cache_version(version(1, ProjectionStatus::Live));
        cache.cache_versions(ProjectionVersions::new(ProjectionName::new("orders")));

        #[allow(clippy::unwrap_used)]
        let versions = cache.get(&ProjectionName::new("orders")).unwrap();
        assert!(versions.is_empty());
    }
}
