//! Version resolver - serves the current versions of a projection name.
//!
//! Resolution sits on the hot path of every read and write, so it is served
//! from the [`VersionCache`] and only falls back to replaying the
//! version-manager projection when the cache is stale (older than the
//! refresh window) or holds nothing for the name. The replay goes through
//! the same [`StreamLoader`] that serves user projections.
//!
//! Refresh is best-effort: a failing replay surfaces as
//! [`RepositoryError::VersionResolution`] but never evicts cached entries -
//! subsequent calls re-attempt after observing staleness again. Concurrent
//! resolutions are not deduplicated; two racing refreshes both replay and
//! the last one wins.

use crate::cache::VersionCache;
use crate::loader::StreamLoader;
use crate::manager::{VersionLifecycle, manager_version, version_manager_id};
use statefold_core::error::{RepositoryError, Result};
use statefold_core::name::{ProjectionContract, ProjectionName, Tenant};
use statefold_core::version::{ProjectionVersion, ProjectionVersions};
use std::sync::Arc;
use std::time::Duration;

/// How long cached versions are served before a refresh is attempted.
pub const DEFAULT_REFRESH_AFTER: Duration = Duration::from_secs(5 * 60);

/// Resolves projection names to their current [`ProjectionVersions`].
#[derive(Clone)]
pub struct VersionResolver {
    loader: StreamLoader,
    cache: Arc<VersionCache>,
    tenant: Tenant,
    refresh_after: Duration,
}

impl VersionResolver {
    /// Create a resolver over a loader and cache for one tenant.
    #[must_use]
    pub const fn new(loader: StreamLoader, cache: Arc<VersionCache>, tenant: Tenant) -> Self {
        Self {
            loader,
            cache,
            tenant,
            refresh_after: DEFAULT_REFRESH_AFTER,
        }
    }

    /// Override the refresh window (default 5 minutes).
    #[must_use]
    pub const fn with_refresh_after(mut self, refresh_after: Duration) -> Self {
        self.refresh_after = refresh_after;
        self
    }

    /// The current versions for a projection name.
    ///
    /// Served from the cache when fresh; otherwise refreshed by replaying
    /// the version-manager projection. The version manager's own name always
    /// resolves to its pinned live version without touching the cache.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::VersionResolution`] when a required
    /// refresh fails. Cached entries are retained.
    pub async fn versions(&self, name: &ProjectionName) -> Result<ProjectionVersions> {
        if *name == VersionLifecycle::projection_name() {
            return Ok(Self::pinned_manager_versions());
        }

        let stale = self
            .cache
            .elapsed_since_refresh()
            .is_none_or(|elapsed| elapsed > self.refresh_after);
        let cached = self.cache.get(name);

        if !stale {
            if let Some(versions) = cached {
                if !versions.is_empty() {
                    return Ok(versions);
                }
            }
        }

        self.refresh(name).await.map_err(|e| {
            tracing::error!(
                projection = %name,
                tenant = %self.tenant,
                error = %e,
                "Version refresh failed; retaining cached entries"
            );
            RepositoryError::VersionResolution {
                name: name.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Replay the version-manager projection and repopulate the cache.
    async fn refresh(&self, name: &ProjectionName) -> Result<ProjectionVersions> {
        let id = version_manager_id(name, &self.tenant);
        let pinned = manager_version();

        let mut stream = self
            .loader
            .load_for_read::<VersionLifecycle>(&id, &pinned)
            .await?;
        let lifecycle: VersionLifecycle = stream.restore().await?;
        let resolved = lifecycle
            .into_versions()
            .unwrap_or_else(|| ProjectionVersions::new(name.clone()));

        let mut refreshed = ProjectionVersions::new(name.clone());
        if let Some(live) = resolved.live() {
            refreshed.apply(live.clone());
        }
        for building in resolved.building() {
            refreshed.apply(building.clone());
        }

        self.cache.cache_versions(refreshed.clone());
        self.cache.mark_refreshed();

        tracing::debug!(
            projection = %name,
            tenant = %self.tenant,
            live = refreshed.live().map(ProjectionVersion::revision),
            building = refreshed.building().count(),
            "Version cache refreshed"
        );

        Ok(refreshed)
    }

    fn pinned_manager_versions() -> ProjectionVersions {
        let pinned = manager_version();
        let mut versions = ProjectionVersions::new(pinned.name().clone());
        versions.apply(pinned);
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::VersionLifecycleEvent;
    use crate::strategy::EventCountStrategy;
    use chrono::Utc;
    use statefold_core::hash::SchemaHash;
    use statefold_core::origin::EventOrigin;
    use statefold_core::store::ProjectionCommitStore;
    use statefold_core::version::ProjectionStatus;
    use statefold_testing::{FlakyCommitStore, InMemoryCommitStore, InMemorySnapshotStore};

    fn version(revision: u64, status: ProjectionStatus) -> ProjectionVersion {
        ProjectionVersion::new(
            ProjectionName::new("orders"),
            status,
            revision,
            SchemaHash::new(5),
        )
    }

    /// Seed lifecycle commits directly into the commit store, bypassing the
    /// repository, so the resolver is exercised in isolation.
    async fn seed_lifecycle(store: &InMemoryCommitStore, events: &[VersionLifecycleEvent]) {
        use statefold_core::commit::ProjectionCommit;
        use statefold_core::event::SerializedEvent;

        for (position, event) in events.iter().enumerate() {
            #[allow(clippy::unwrap_used)]
            let serialized = SerializedEvent::from_event(event).unwrap();
            let id = version_manager_id(event.version().name(), event.tenant());
            let commit = ProjectionCommit::new(
                id,
                manager_version(),
                serialized,
                1,
                EventOrigin::new("version-agg".to_string(), 1, position as u64, Utc::now()),
                Utc::now(),
            );
            #[allow(clippy::unwrap_used)]
            store.append(commit).await.unwrap();
        }
    }

    fn resolver_over(
        commits: Arc<dyn ProjectionCommitStore>,
        cache: Arc<VersionCache>,
    ) -> VersionResolver {
        let loader = StreamLoader::new(
            commits,
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(EventCountStrategy::new(10)),
        );
        VersionResolver::new(loader, cache, Tenant::default())
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn manager_name_resolves_pinned_without_io() {
        let commits = Arc::new(InMemoryCommitStore::new());
        let resolver = resolver_over(commits.clone(), Arc::new(VersionCache::new()));

        let versions = resolver
            .versions(&VersionLifecycle::projection_name())
            .await
            .unwrap();

        assert_eq!(versions.live().map(ProjectionVersion::revision), Some(1));
        let manager_id =
            version_manager_id(&VersionLifecycle::projection_name(), &Tenant::default());
        assert_eq!(commits.load_count_for(&manager_id), 0);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn refresh_caches_live_and_building_only() {
        let commits = Arc::new(InMemoryCommitStore::new());
        let tenant = Tenant::default();
        seed_lifecycle(
            &commits,
            &[
                VersionLifecycleEvent::WentLive {
                    tenant: tenant.clone(),
                    version: version(1, ProjectionStatus::Live),
                },
                VersionLifecycleEvent::BuildStarted {
                    tenant: tenant.clone(),
                    version: version(2, ProjectionStatus::Building),
                },
                VersionLifecycleEvent::VersionRequested {
                    tenant,
                    version: version(3, ProjectionStatus::New),
                },
            ],
        )
        .await;

        let cache = Arc::new(VersionCache::new());
        let resolver = resolver_over(commits, Arc::clone(&cache));

        let name = ProjectionName::new("orders");
        let versions = resolver.versions(&name).await.unwrap();

        assert_eq!(versions.live().map(ProjectionVersion::revision), Some(1));
        assert_eq!(versions.write_targets().len(), 2);
        // The New version is resolvable but not cached.
        let cached = cache.get(&name).unwrap();
        assert_eq!(cached.len(), 2);
        assert!(cached.get(3).is_none());
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn failed_refresh_surfaces_error_and_retains_cache() {
        let inner = Arc::new(InMemoryCommitStore::new());
        let tenant = Tenant::default();
        seed_lifecycle(
            &inner,
            &[VersionLifecycleEvent::WentLive {
                tenant,
                version: version(1, ProjectionStatus::Live),
            }],
        )
        .await;

        let flaky = Arc::new(FlakyCommitStore::new(
            inner as Arc<dyn ProjectionCommitStore>,
            |_| false,
        ));
        let cache = Arc::new(VersionCache::new());
        let resolver = resolver_over(
            Arc::clone(&flaky) as Arc<dyn ProjectionCommitStore>,
            Arc::clone(&cache),
        )
        .with_refresh_after(Duration::ZERO);

        let name = ProjectionName::new("orders");
        let resolved = resolver.versions(&name).await.unwrap();
        assert_eq!(resolved.live().map(ProjectionVersion::revision), Some(1));

        // The store goes down; the next (stale) resolution fails but the
        // cached entry survives for later attempts.
        flaky.failing_loads(true);
        let result = resolver.versions(&name).await;
        assert!(matches!(
            result,
            Err(RepositoryError::VersionResolution { .. })
        ));
        assert_eq!(cache.get(&name).unwrap().len(), 1);

        // Recovery: resolution works again without any reseeding.
        flaky.failing_loads(false);
        let recovered = resolver.versions(&name).await.unwrap();
        assert_eq!(recovered.live().map(ProjectionVersion::revision), Some(1));
    }
}
