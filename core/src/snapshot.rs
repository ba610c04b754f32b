//! Checkpointed projection state.
//!
//! A snapshot captures a projection instance's serialized state at a revision
//! boundary so reconstruction replays only the commits written after it.
//! Absence of a snapshot is `Option::None` - there is no zero-revision
//! sentinel; marker arithmetic simply treats a missing snapshot as revision 0.

use crate::id::ProjectionId;
use crate::name::ProjectionName;
use serde::{Deserialize, Serialize};

/// A materialized projection state at a snapshot revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    projection_id: ProjectionId,
    projection_name: ProjectionName,
    state: Vec<u8>,
    revision: u64,
}

impl Snapshot {
    /// Create a new snapshot.
    #[must_use]
    pub const fn new(
        projection_id: ProjectionId,
        projection_name: ProjectionName,
        state: Vec<u8>,
        revision: u64,
    ) -> Self {
        Self {
            projection_id,
            projection_name,
            state,
            revision,
        }
    }

    /// The projection instance this snapshot belongs to.
    #[must_use]
    pub const fn projection_id(&self) -> &ProjectionId {
        &self.projection_id
    }

    /// The projection name.
    #[must_use]
    pub const fn projection_name(&self) -> &ProjectionName {
        &self.projection_name
    }

    /// The opaque serialized projection state.
    #[must_use]
    pub fn state(&self) -> &[u8] {
        &self.state
    }

    /// The snapshot revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The metadata view of this snapshot (everything but the state).
    #[must_use]
    pub fn meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            projection_id: self.projection_id.clone(),
            projection_name: self.projection_name.clone(),
            revision: self.revision,
        }
    }
}

/// Snapshot metadata - cheap to fetch when only the revision matters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    projection_id: ProjectionId,
    projection_name: ProjectionName,
    revision: u64,
}

impl SnapshotMeta {
    /// Create snapshot metadata.
    #[must_use]
    pub const fn new(
        projection_id: ProjectionId,
        projection_name: ProjectionName,
        revision: u64,
    ) -> Self {
        Self {
            projection_id,
            projection_name,
            revision,
        }
    }

    /// The projection instance.
    #[must_use]
    pub const fn projection_id(&self) -> &ProjectionId {
        &self.projection_id
    }

    /// The projection name.
    #[must_use]
    pub const fn projection_name(&self) -> &ProjectionName {
        &self.projection_name
    }

    /// The snapshot revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}
