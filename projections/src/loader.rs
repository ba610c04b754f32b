//! Stream loader - pages commits out of the store and checkpoints snapshots.
//!
//! # Overview
//!
//! Reconstruction pages commits in fixed-size windows keyed by snapshot
//! marker. The read path folds as it pages and emits a new snapshot every
//! time a full page accumulates, so replay cost and memory stay bounded for
//! long-lived projections. The write path only needs to *count* commits past
//! the snapshot to derive the next marker, so it fetches snapshot metadata
//! instead of state and never folds.
//!
//! Checkpointing is a side effect on the read path: reads may write
//! snapshots. This is safe under concurrent readers because a snapshot at
//! revision `r + 1` is a function of commits up to a deterministic marker -
//! racing readers produce equal snapshots and last-writer-wins is
//! acceptable.
//!
//! Cancellation is cooperative: every suspension point is a store call, and
//! a dropped load leaves no partial snapshot behind (snapshots are written
//! only after a page completes).

use crate::strategy::SnapshotStrategy;
use crate::stream::{ProjectionStream, SnapshotSource, fold_commits};
use statefold_core::commit::ProjectionCommit;
use statefold_core::error::Result;
use statefold_core::id::ProjectionId;
use statefold_core::projection::Projection;
use statefold_core::snapshot::{Snapshot, SnapshotMeta};
use statefold_core::store::{ProjectionCommitStore, SnapshotStore};
use statefold_core::version::ProjectionVersion;
use std::sync::Arc;

/// Pages commit history out of the stores on behalf of reads, writes, and
/// the version resolver.
#[derive(Clone)]
pub struct StreamLoader {
    commits: Arc<dyn ProjectionCommitStore>,
    snapshots: Arc<dyn SnapshotStore>,
    strategy: Arc<dyn SnapshotStrategy>,
}

impl StreamLoader {
    /// Create a loader over the given stores and checkpointing strategy.
    #[must_use]
    pub fn new(
        commits: Arc<dyn ProjectionCommitStore>,
        snapshots: Arc<dyn SnapshotStore>,
        strategy: Arc<dyn SnapshotStrategy>,
    ) -> Self {
        Self {
            commits,
            snapshots,
            strategy,
        }
    }

    /// The checkpointing strategy this loader pages with.
    #[must_use]
    pub fn strategy(&self) -> &dyn SnapshotStrategy {
        self.strategy.as_ref()
    }

    /// Load a stream for reconstruction, checkpointing snapshots as full
    /// pages accumulate.
    ///
    /// The returned stream holds the commits past the latest (possibly just
    /// written) snapshot, with that snapshot eagerly attached.
    ///
    /// # Errors
    ///
    /// Returns a store error if paging or snapshot I/O fails, or a
    /// serialization error if the snapshot state or a commit payload does
    /// not decode. On error nothing is returned and no partial snapshot is
    /// written.
    pub async fn load_for_read<P: Projection>(
        &self,
        projection_id: &ProjectionId,
        version: &ProjectionVersion,
    ) -> Result<ProjectionStream> {
        let name = P::projection_name();
        let snapshottable = P::snapshottable();

        let mut snapshot: Option<Snapshot> = if snapshottable {
            self.snapshots
                .load(name.clone(), projection_id.clone(), version.clone())
                .await?
        } else {
            None
        };
        let mut revision = snapshot.as_ref().map_or(0, Snapshot::revision);

        // Running state mirrors the latest snapshot; only needed to fold
        // checkpoints, the final fold happens in the stream.
        let mut current: P = match &snapshot {
            Some(s) => P::from_snapshot_state(s.state())?,
            None => P::default(),
        };

        let mut accumulated: Vec<ProjectionCommit> = Vec::new();
        let mut marker = revision;
        let page_size = self.strategy.events_in_snapshot();

        loop {
            marker += 1;
            let page = self
                .commits
                .load_page(version.clone(), projection_id.clone(), marker)
                .await?;
            let page_len = page.len();
            accumulated.extend(page);

            if snapshottable && self.strategy.should_create_snapshot(&accumulated, revision) {
                fold_commits(&mut current, &accumulated)?;
                revision += 1;
                let checkpoint = Snapshot::new(
                    projection_id.clone(),
                    name.clone(),
                    current.snapshot_state()?,
                    revision,
                );
                self.snapshots
                    .save(checkpoint.clone(), version.clone())
                    .await?;
                tracing::debug!(
                    projection = %name,
                    id = %projection_id,
                    revision,
                    "Snapshot checkpointed during read"
                );
                snapshot = Some(checkpoint);
                // Folded into the snapshot; keeping them would double-apply.
                accumulated.clear();
            }

            if page_len < page_size {
                break;
            }
            if page_len > page_size + page_size / 2 {
                tracing::warn!(
                    projection = %name,
                    id = %projection_id,
                    marker,
                    page_len,
                    page_size,
                    "Memory pressure: page overruns snapshot sizing, check store pagination"
                );
            }
        }

        Ok(ProjectionStream::new(
            projection_id.clone(),
            accumulated,
            SnapshotSource::Eager(snapshot),
        ))
    }

    /// Load a stream for marker derivation on the write path.
    ///
    /// Fetches snapshot metadata only and never folds or checkpoints; the
    /// stream's snapshot stays deferred, so the snapshot state is fetched
    /// only if somebody restores the stream. Returns the stream and the
    /// snapshot revision the accumulated commits sit on top of.
    ///
    /// # Errors
    ///
    /// Returns a store error if metadata or page loading fails.
    pub async fn load_for_write<P: Projection>(
        &self,
        projection_id: &ProjectionId,
        version: &ProjectionVersion,
    ) -> Result<(ProjectionStream, u64)> {
        let name = P::projection_name();

        let meta: Option<SnapshotMeta> = if P::snapshottable() {
            self.snapshots
                .load_meta(name.clone(), projection_id.clone(), version.clone())
                .await?
        } else {
            None
        };
        let revision = meta.as_ref().map_or(0, SnapshotMeta::revision);

        let mut accumulated: Vec<ProjectionCommit> = Vec::new();
        let mut marker = revision;
        let page_size = self.strategy.events_in_snapshot();

        loop {
            marker += 1;
            let page = self
                .commits
                .load_page(version.clone(), projection_id.clone(), marker)
                .await?;
            let page_len = page.len();
            accumulated.extend(page);

            if page_len < page_size {
                break;
            }
            if page_len > page_size + page_size / 2 {
                tracing::warn!(
                    projection = %name,
                    id = %projection_id,
                    marker,
                    page_len,
                    page_size,
                    "Memory pressure: page overruns snapshot sizing, check store pagination"
                );
            }
        }

        let snapshot = if P::snapshottable() {
            let snapshots = Arc::clone(&self.snapshots);
            let (deferred_name, deferred_id, deferred_version) =
                (name, projection_id.clone(), version.clone());
            SnapshotSource::Deferred(Box::pin(async move {
                snapshots
                    .load(deferred_name, deferred_id, deferred_version)
                    .await
            }))
        } else {
            SnapshotSource::Eager(None)
        };

        Ok((
            ProjectionStream::new(projection_id.clone(), accumulated, snapshot),
            revision,
        ))
    }
}
