//! Projection stream - an ordered commit batch plus its snapshot.
//!
//! # Overview
//!
//! A `ProjectionStream` is the value a loader hands back from the commit
//! log: the commits accumulated past the latest snapshot, together with that
//! snapshot (or the means to fetch it). Folding the commits onto the
//! snapshot state yields the projection's current state.
//!
//! Guarantees:
//!
//! - **Deterministic fold**: commits are applied in the order the store
//!   returned them (insertion order, stable per marker).
//! - **Lazy snapshot**: a stream built with a deferred snapshot skips the
//!   snapshot I/O entirely unless something restores it. The write path
//!   relies on this - it only ever counts commits.
//! - **Idempotent restoration**: [`ProjectionStream::restore`] may be called
//!   repeatedly; each call yields an equal state. The deferred snapshot is
//!   fetched at most once and cached.
//!
//! A stream is a short-lived value owned by one operation; it is not shared
//! across tasks.

use statefold_core::commit::ProjectionCommit;
use statefold_core::error::{RepositoryError, Result};
use statefold_core::id::ProjectionId;
use statefold_core::projection::Projection;
use statefold_core::snapshot::Snapshot;
use statefold_core::store::StoreError;
use std::future::Future;
use std::pin::Pin;

/// How a stream obtains its snapshot: already loaded, or fetched on first
/// use (and cached thereafter).
pub enum SnapshotSource {
    /// The snapshot (or its absence) is already in hand.
    Eager(Option<Snapshot>),
    /// The snapshot is fetched when first needed; consumed at most once.
    Deferred(Pin<Box<dyn Future<Output = std::result::Result<Option<Snapshot>, StoreError>> + Send>>),
}

impl std::fmt::Debug for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eager(snapshot) => f.debug_tuple("Eager").field(snapshot).finish(),
            Self::Deferred(_) => write!(f, "Deferred(<future>)"),
        }
    }
}

/// Fold commits into a projection state, in persisted order.
///
/// # Errors
///
/// Returns [`RepositoryError::Serialization`] if a commit's event payload
/// does not decode to `P::Event`.
pub fn fold_commits<P: Projection>(state: &mut P, commits: &[ProjectionCommit]) -> Result<()> {
    for commit in commits {
        let event: P::Event = commit.event().decode()?;
        state.apply(&event);
    }
    Ok(())
}

/// An ordered commit batch plus a lazily loaded snapshot.
#[derive(Debug)]
pub struct ProjectionStream {
    projection_id: ProjectionId,
    commits: Vec<ProjectionCommit>,
    snapshot: SnapshotSource,
}

impl ProjectionStream {
    /// Create a stream from loaded commits and a snapshot source.
    #[must_use]
    pub const fn new(
        projection_id: ProjectionId,
        commits: Vec<ProjectionCommit>,
        snapshot: SnapshotSource,
    ) -> Self {
        Self {
            projection_id,
            commits,
            snapshot,
        }
    }

    /// The distinguished empty stream: no commits, no snapshot. Folds to the
    /// zero value of any projection type.
    #[must_use]
    pub const fn empty(projection_id: ProjectionId) -> Self {
        Self {
            projection_id,
            commits: Vec::new(),
            snapshot: SnapshotSource::Eager(None),
        }
    }

    /// The projection instance this stream belongs to.
    #[must_use]
    pub const fn projection_id(&self) -> &ProjectionId {
        &self.projection_id
    }

    /// The commits accumulated past the snapshot, in persisted order.
    #[must_use]
    pub fn commits(&self) -> &[ProjectionCommit] {
        &self.commits
    }

    /// Whether the stream holds neither commits nor an eager snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty() && matches!(self.snapshot, SnapshotSource::Eager(None))
    }

    /// Materialize the snapshot, fetching it on first call if deferred.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] if a deferred fetch fails.
    pub async fn snapshot(&mut self) -> Result<Option<&Snapshot>> {
        let fetched = match &mut self.snapshot {
            SnapshotSource::Eager(_) => None,
            SnapshotSource::Deferred(fetch) => {
                Some(fetch.await.map_err(RepositoryError::Store)?)
            },
        };
        if let Some(loaded) = fetched {
            self.snapshot = SnapshotSource::Eager(loaded);
        }
        match &self.snapshot {
            SnapshotSource::Eager(snapshot) => Ok(snapshot.as_ref()),
            // Unreachable: materialized above.
            SnapshotSource::Deferred(_) => Ok(None),
        }
    }

    /// Reconstruct the projection state from this stream.
    ///
    /// Materializes the snapshot, rehydrates the state (or starts from the
    /// zero value), then folds the commits in persisted order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Serialization`] if the snapshot state or a
    /// commit payload does not decode, or [`RepositoryError::Store`] if the
    /// deferred snapshot fetch fails.
    pub async fn restore<P: Projection>(&mut self) -> Result<P> {
        let mut state = match self.snapshot().await? {
            Some(snapshot) => P::from_snapshot_state(snapshot.state())?,
            None => P::default(),
        };
        fold_commits(&mut state, &self.commits)?;
        Ok(state)
    }
}
