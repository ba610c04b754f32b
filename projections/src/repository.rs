//! Projection repository - the top-level façade.
//!
//! # Overview
//!
//! The repository ties the pieces together:
//!
//! - **Writes** fan out a domain event to every write-eligible version of
//!   every projection instance the event maps to, deriving the snapshot
//!   marker from the current stream. While a rebuild is running, live and
//!   building versions both receive the event, so the rebuild converges to
//!   the live state by the time it flips over.
//! - **Reads** resolve the live version, page-and-checkpoint through the
//!   commit log, and fold the resulting stream into the requested type.
//! - **Version resolution** is cached and bootstrapped through the same
//!   loader (see [`VersionResolver`]).
//!
//! Failure policy: fan-out writes prioritize liveness - one bad version is
//! logged with a replay hint and never blocks its siblings. Reads prioritize
//! honesty - any failure surfaces as a failed result, never a partial state.
//!
//! # Example
//!
//! ```ignore
//! let repository = ProjectionRepository::new(commit_store, snapshot_store, registry);
//!
//! // Fan-out write from the message dispatcher:
//! repository.save::<OrderSummary>(&event, origin).await?;
//!
//! // Targeted write from the rebuild worker:
//! repository.save_to::<OrderSummary>(&event, origin, &building_version).await?;
//!
//! // Read:
//! let summary: OrderSummary = repository.get(&ProjectionId::from("order-42")).await?;
//! ```

use crate::cache::VersionCache;
use crate::loader::StreamLoader;
use crate::registry::ProjectionRegistry;
use crate::resolver::VersionResolver;
use crate::strategy::{EventCountStrategy, SnapshotStrategy};
use crate::stream::ProjectionStream;
use statefold_core::clock::{Clock, SystemClock};
use statefold_core::commit::ProjectionCommit;
use statefold_core::error::{RepositoryError, Result};
use statefold_core::event::SerializedEvent;
use statefold_core::id::ProjectionId;
use statefold_core::name::Tenant;
use statefold_core::origin::EventOrigin;
use statefold_core::projection::Projection;
use statefold_core::store::{ProjectionCommitStore, SnapshotStore};
use statefold_core::version::ProjectionVersion;
use std::sync::Arc;
use std::time::Duration;

/// Top-level projection repository.
///
/// Cheap to clone pieces are shared behind `Arc`s; the repository itself is
/// `Send + Sync` and may be used concurrently.
pub struct ProjectionRepository {
    commits: Arc<dyn ProjectionCommitStore>,
    snapshots: Arc<dyn SnapshotStore>,
    strategy: Arc<dyn SnapshotStrategy>,
    clock: Arc<dyn Clock>,
    registry: Arc<ProjectionRegistry>,
    cache: Arc<VersionCache>,
    tenant: Tenant,
    refresh_after: Duration,
}

impl ProjectionRepository {
    /// Create a repository with the default strategy (500 events per
    /// snapshot), system clock, default tenant, and a fresh version cache.
    #[must_use]
    pub fn new(
        commits: Arc<dyn ProjectionCommitStore>,
        snapshots: Arc<dyn SnapshotStore>,
        registry: Arc<ProjectionRegistry>,
    ) -> Self {
        Self {
            commits,
            snapshots,
            strategy: Arc::new(EventCountStrategy::default()),
            clock: Arc::new(SystemClock),
            registry,
            cache: Arc::new(VersionCache::new()),
            tenant: Tenant::default(),
            refresh_after: crate::resolver::DEFAULT_REFRESH_AFTER,
        }
    }

    /// Override the snapshot strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn SnapshotStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Override the clock (deterministic `persisted_at` in tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Scope version resolution to a tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant: Tenant) -> Self {
        self.tenant = tenant;
        self
    }

    /// Override the version-cache refresh window (default 5 minutes).
    #[must_use]
    pub const fn with_refresh_after(mut self, refresh_after: Duration) -> Self {
        self.refresh_after = refresh_after;
        self
    }

    /// Share a version cache between repository instances.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<VersionCache>) -> Self {
        self.cache = cache;
        self
    }

    fn loader(&self) -> StreamLoader {
        StreamLoader::new(
            Arc::clone(&self.commits),
            Arc::clone(&self.snapshots),
            Arc::clone(&self.strategy),
        )
    }

    fn resolver(&self) -> VersionResolver {
        VersionResolver::new(self.loader(), Arc::clone(&self.cache), self.tenant.clone())
            .with_refresh_after(self.refresh_after)
    }

    /// Fan-out write: persist `event` to every write-eligible version of
    /// every projection instance it maps to.
    ///
    /// Mapping to zero instances is a no-op. Per-version failures are
    /// logged with enough context to replay the version and do not stop the
    /// remaining versions; the call succeeds as long as routing and version
    /// resolution succeed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Serialization`] if the event cannot be
    /// serialized, or [`RepositoryError::VersionResolution`] if the
    /// versions for the projection cannot be resolved.
    pub async fn save<P: Projection>(&self, event: &P::Event, origin: EventOrigin) -> Result<()> {
        let projection_ids = P::projection_ids(event);
        if projection_ids.is_empty() {
            return Ok(());
        }

        let name = P::projection_name();
        let serialized = SerializedEvent::from_event(event)?;
        let resolver = self.resolver();

        for projection_id in projection_ids {
            let versions = resolver.versions(&name).await?;

            for version in versions.write_targets() {
                self.warn_on_schema_drift(&version);
                if let Err(e) = self
                    .write_one::<P>(&projection_id, &version, &serialized, &origin)
                    .await
                {
                    tracing::error!(
                        projection = %name,
                        id = %projection_id,
                        revision = version.revision(),
                        origin = %origin,
                        error = %e,
                        "Commit failed for one version; continuing with remaining versions. \
                         Replay this version to heal."
                    );
                }
            }
        }

        Ok(())
    }

    /// Targeted write: persist `event` to exactly one version.
    ///
    /// Used by the rebuild worker, which knows which building version it is
    /// feeding. Rejects before any I/O when the version is not
    /// write-eligible or does not belong to `P`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidArgument`] on an ineligible or
    /// mismatched version, [`RepositoryError::WriteFailed`] if persisting
    /// fails, or [`RepositoryError::Serialization`] if the event cannot be
    /// serialized.
    pub async fn save_to<P: Projection>(
        &self,
        event: &P::Event,
        origin: EventOrigin,
        version: &ProjectionVersion,
    ) -> Result<()> {
        let name = P::projection_name();
        if !version.is_write_eligible() {
            return Err(RepositoryError::InvalidArgument(format!(
                "version {version} is not write-eligible (status must be building or live)"
            )));
        }
        if version.name() != &name {
            return Err(RepositoryError::InvalidArgument(format!(
                "version {version} does not belong to projection '{name}'"
            )));
        }

        let serialized = SerializedEvent::from_event(event)?;
        for projection_id in P::projection_ids(event) {
            self.write_one::<P>(&projection_id, version, &serialized, &origin)
                .await?;
        }
        Ok(())
    }

    /// Reconstruct the current state of one projection instance.
    ///
    /// Resolves the live version, pages the commit log (checkpointing
    /// snapshots along the way), and folds the stream into `P`. A missing
    /// live version yields the zero value of `P`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::VersionResolution`] if versions cannot be
    /// resolved, or [`RepositoryError::ReadFailed`] if loading or folding
    /// fails. No partial state is ever returned.
    pub async fn get<P: Projection>(&self, projection_id: &ProjectionId) -> Result<P> {
        let mut stream = self.load::<P>(projection_id).await?;
        stream
            .restore()
            .await
            .map_err(|e| RepositoryError::ReadFailed {
                name: P::projection_name(),
                reason: e.to_string(),
            })
    }

    /// Load the commit stream of one projection instance at its live
    /// version.
    ///
    /// Yields [`ProjectionStream::empty`] (with a warning) when no live
    /// version exists.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::VersionResolution`] if versions cannot be
    /// resolved, or [`RepositoryError::ReadFailed`] if paging fails.
    pub async fn load<P: Projection>(&self, projection_id: &ProjectionId) -> Result<ProjectionStream> {
        let name = P::projection_name();
        let versions = self.resolver().versions(&name).await?;

        let Some(live) = versions.live() else {
            tracing::warn!(
                projection = %name,
                id = %projection_id,
                "No live version; serving the empty stream"
            );
            return Ok(ProjectionStream::empty(projection_id.clone()));
        };
        self.warn_on_schema_drift(live);

        self.loader()
            .load_for_read::<P>(projection_id, live)
            .await
            .map_err(|e| RepositoryError::ReadFailed {
                name: name.clone(),
                reason: e.to_string(),
            })
    }

    /// Blocking façade over [`ProjectionRepository::get`], driving the
    /// async implementation on an in-place executor.
    ///
    /// # Errors
    ///
    /// Same as [`ProjectionRepository::get`].
    pub fn get_blocking<P: Projection>(&self, projection_id: &ProjectionId) -> Result<P> {
        futures::executor::block_on(self.get::<P>(projection_id))
    }

    /// Blocking façade over [`ProjectionRepository::save`].
    ///
    /// # Errors
    ///
    /// Same as [`ProjectionRepository::save`].
    pub fn save_blocking<P: Projection>(&self, event: &P::Event, origin: EventOrigin) -> Result<()> {
        futures::executor::block_on(self.save::<P>(event, origin))
    }

    /// One independent `(projection_id, version)` write: derive the marker
    /// from the current stream, then append the commit.
    async fn write_one<P: Projection>(
        &self,
        projection_id: &ProjectionId,
        version: &ProjectionVersion,
        serialized: &SerializedEvent,
        origin: &EventOrigin,
    ) -> Result<()> {
        let name = P::projection_name();
        let (stream, snapshot_revision) = self
            .loader()
            .load_for_write::<P>(projection_id, version)
            .await
            .map_err(|e| RepositoryError::WriteFailed {
                name: name.clone(),
                revision: version.revision(),
                reason: e.to_string(),
            })?;

        let marker = self
            .strategy
            .snapshot_marker(stream.commits(), snapshot_revision);

        let commit = ProjectionCommit::new(
            projection_id.clone(),
            version.clone(),
            serialized.clone(),
            marker,
            origin.clone(),
            self.clock.now(),
        );

        self.commits
            .append(commit)
            .await
            .map_err(|e| RepositoryError::WriteFailed {
                name,
                revision: version.revision(),
                reason: e.to_string(),
            })
    }

    /// Log when a resolved version's hash disagrees with the registered
    /// definition - the code changed shape without a new revision.
    fn warn_on_schema_drift(&self, version: &ProjectionVersion) {
        if let Some(registered) = self.registry.schema_hash(version.name()) {
            if registered != version.hash() {
                tracing::warn!(
                    projection = %version.name(),
                    revision = version.revision(),
                    version_hash = %version.hash(),
                    registered_hash = %registered,
                    "Schema hash mismatch: definition changed shape, request a new revision"
                );
            }
        }
    }
}
