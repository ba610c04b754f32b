//! The persisted record of an event applied to a projection instance.

use crate::event::SerializedEvent;
use crate::id::ProjectionId;
use crate::origin::EventOrigin;
use crate::version::ProjectionVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in a projection's commit log.
///
/// A commit records that `event` was applied to projection instance
/// `projection_id` at `version`. The `snapshot_marker` is the page index the
/// commit belongs to: commits since the latest snapshot are partitioned into
/// fixed-size pages per snapshot revision, so the store can index by
/// `(version, projection_id, snapshot_marker)` and serve ranged reads.
///
/// Commits are created by the repository on write, owned by the projection
/// store thereafter, and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionCommit {
    projection_id: ProjectionId,
    version: ProjectionVersion,
    event: SerializedEvent,
    snapshot_marker: u64,
    origin: EventOrigin,
    persisted_at: DateTime<Utc>,
}

impl ProjectionCommit {
    /// Create a new commit record.
    #[must_use]
    pub const fn new(
        projection_id: ProjectionId,
        version: ProjectionVersion,
        event: SerializedEvent,
        snapshot_marker: u64,
        origin: EventOrigin,
        persisted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            projection_id,
            version,
            event,
            snapshot_marker,
            origin,
            persisted_at,
        }
    }

    /// The projection instance this commit belongs to.
    #[must_use]
    pub const fn projection_id(&self) -> &ProjectionId {
        &self.projection_id
    }

    /// The version the event was applied under.
    #[must_use]
    pub const fn version(&self) -> &ProjectionVersion {
        &self.version
    }

    /// The serialized event.
    #[must_use]
    pub const fn event(&self) -> &SerializedEvent {
        &self.event
    }

    /// The snapshot page index this commit was written into.
    #[must_use]
    pub const fn snapshot_marker(&self) -> u64 {
        self.snapshot_marker
    }

    /// The originating event's address (idempotency key).
    #[must_use]
    pub const fn origin(&self) -> &EventOrigin {
        &self.origin
    }

    /// When this commit was persisted.
    #[must_use]
    pub const fn persisted_at(&self) -> DateTime<Utc> {
        self.persisted_at
    }
}
