//! Projection version lifecycle types.
//!
//! A projection evolves through named, hashed, status-tagged generations.
//! New code versions introduce new generations that are rebuilt in the
//! background before going live:
//!
//! ```text
//! New ──▶ Building ──▶ Live
//!             │
//!             ├──▶ Canceled
//!             └──▶ Timedout
//! ```
//!
//! Only `Building` and `Live` versions receive writes; only the `Live`
//! version serves reads. At most one version per projection name is `Live`
//! at any instant.

use crate::hash::SchemaHash;
use crate::name::ProjectionName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle status of a projection version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionStatus {
    /// Requested but not yet being rebuilt.
    New,
    /// A background rebuild is feeding this version.
    Building,
    /// The version serving reads.
    Live,
    /// The rebuild was canceled before completion.
    Canceled,
    /// The rebuild exceeded its timebox.
    Timedout,
}

impl ProjectionStatus {
    /// Whether commits may be appended to a version in this status.
    #[must_use]
    pub const fn is_write_eligible(self) -> bool {
        matches!(self, Self::Building | Self::Live)
    }

    /// Whether a version in this status may serve reads.
    #[must_use]
    pub const fn is_read_eligible(self) -> bool {
        matches!(self, Self::Live)
    }

    /// Whether this status is a terminal rebuild outcome.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Timedout)
    }
}

impl fmt::Display for ProjectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Building => "building",
            Self::Live => "live",
            Self::Canceled => "canceled",
            Self::Timedout => "timedout",
        };
        write!(f, "{s}")
    }
}

/// A single generation of a projection.
///
/// `revision` increases monotonically per name; `hash` fingerprints the
/// definition's shape at that revision. Two versions with equal
/// `(name, revision)` must carry an equal hash - a differing hash signals a
/// schema change and requires a new revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionVersion {
    name: ProjectionName,
    status: ProjectionStatus,
    revision: u64,
    hash: SchemaHash,
}

impl ProjectionVersion {
    /// Create a new version descriptor.
    #[must_use]
    pub const fn new(
        name: ProjectionName,
        status: ProjectionStatus,
        revision: u64,
        hash: SchemaHash,
    ) -> Self {
        Self {
            name,
            status,
            revision,
            hash,
        }
    }

    /// The projection name this version belongs to.
    #[must_use]
    pub const fn name(&self) -> &ProjectionName {
        &self.name
    }

    /// The lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ProjectionStatus {
        self.status
    }

    /// The monotonically increasing revision number.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The schema fingerprint at this revision.
    #[must_use]
    pub const fn hash(&self) -> SchemaHash {
        self.hash
    }

    /// A copy of this version with a different status.
    #[must_use]
    pub fn with_status(&self, status: ProjectionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Whether commits may be appended to this version.
    #[must_use]
    pub const fn is_write_eligible(&self) -> bool {
        self.status.is_write_eligible()
    }

    /// Whether this version may serve reads.
    #[must_use]
    pub const fn is_read_eligible(&self) -> bool {
        self.status.is_read_eligible()
    }
}

impl fmt::Display for ProjectionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.revision, self.status)
    }
}

/// The set of non-retired versions of one projection name.
///
/// Maintains the lifecycle invariants under upserts:
///
/// - at most one `Live` version
/// - `Building` revisions are strictly above the `Live` revision
/// - when a version goes `Live`, every older version (and any terminal
///   version at or below it) is retired from the set
///
/// Upserts are total functions: an update that would violate an invariant
/// (e.g. a `Building` version at or below the live revision) is dropped
/// rather than corrupting the set, because the version manager folds these
/// from an event stream and the fold must never fail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionVersions {
    name: ProjectionName,
    versions: BTreeMap<u64, ProjectionVersion>,
}

impl ProjectionVersions {
    /// Create an empty version set for a name.
    #[must_use]
    pub const fn new(name: ProjectionName) -> Self {
        Self {
            name,
            versions: BTreeMap::new(),
        }
    }

    /// The projection name this set tracks.
    #[must_use]
    pub const fn name(&self) -> &ProjectionName {
        &self.name
    }

    /// The live version, if any.
    #[must_use]
    pub fn live(&self) -> Option<&ProjectionVersion> {
        self.versions
            .values()
            .find(|v| v.status() == ProjectionStatus::Live)
    }

    /// All building versions, in revision order.
    pub fn building(&self) -> impl Iterator<Item = &ProjectionVersion> {
        self.versions
            .values()
            .filter(|v| v.status() == ProjectionStatus::Building)
    }

    /// Every write-eligible version (live plus building), in revision order.
    #[must_use]
    pub fn write_targets(&self) -> Vec<ProjectionVersion> {
        self.versions
            .values()
            .filter(|v| v.is_write_eligible())
            .cloned()
            .collect()
    }

    /// Look up a version by revision.
    #[must_use]
    pub fn get(&self, revision: u64) -> Option<&ProjectionVersion> {
        self.versions.get(&revision)
    }

    /// Upsert a version, preserving the set invariants.
    ///
    /// Semantics by incoming status:
    ///
    /// - `Live`: replaces the entry at its revision, then retires everything
    ///   below it and demotes any other live entry (last live wins).
    /// - `Building`/`New`: ignored when at or below the current live
    ///   revision (a stale transition); otherwise upserted.
    /// - `Canceled`/`Timedout`: upserted in place; retained until a later
    ///   revision goes live.
    pub fn apply(&mut self, version: ProjectionVersion) {
        debug_assert_eq!(version.name(), &self.name);

        match version.status() {
            ProjectionStatus::Live => {
                let revision = version.revision();
                self.versions.insert(revision, version);
                self.versions.retain(|rev, v| {
                    *rev == revision || (*rev > revision && v.status() != ProjectionStatus::Live)
                });
            },
            ProjectionStatus::New | ProjectionStatus::Building => {
                let live_revision = self.live().map(ProjectionVersion::revision);
                if live_revision.is_none_or(|live| version.revision() > live) {
                    self.versions.insert(version.revision(), version);
                }
            },
            ProjectionStatus::Canceled | ProjectionStatus::Timedout => {
                self.versions.insert(version.revision(), version);
            },
        }
    }

    /// Number of tracked versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the set tracks no versions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Iterate over all tracked versions in revision order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectionVersion> {
        self.versions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(revision: u64, status: ProjectionStatus) -> ProjectionVersion {
        ProjectionVersion::new(
            ProjectionName::new("orders"),
            status,
            revision,
            SchemaHash::new(0xfeed),
        )
    }

    fn versions() -> ProjectionVersions {
        ProjectionVersions::new(ProjectionName::new("orders"))
    }

    #[test]
    fn status_eligibility() {
        assert!(ProjectionStatus::Live.is_write_eligible());
        assert!(ProjectionStatus::Building.is_write_eligible());
        assert!(!ProjectionStatus::New.is_write_eligible());
        assert!(!ProjectionStatus::Canceled.is_write_eligible());
        assert!(!ProjectionStatus::Timedout.is_write_eligible());

        assert!(ProjectionStatus::Live.is_read_eligible());
        assert!(!ProjectionStatus::Building.is_read_eligible());
    }

    #[test]
    fn live_singleton_is_preserved() {
        let mut set = versions();
        set.apply(version(1, ProjectionStatus::Live));
        set.apply(version(2, ProjectionStatus::Building));
        set.apply(version(2, ProjectionStatus::Live));

        let live: Vec<_> = set
            .iter()
            .filter(|v| v.status() == ProjectionStatus::Live)
            .collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].revision(), 2);
    }

    #[test]
    fn going_live_retires_older_versions() {
        let mut set = versions();
        set.apply(version(1, ProjectionStatus::Live));
        set.apply(version(2, ProjectionStatus::Canceled));
        set.apply(version(3, ProjectionStatus::Building));
        set.apply(version(3, ProjectionStatus::Live));

        assert_eq!(set.len(), 1);
        assert_eq!(set.live().map(ProjectionVersion::revision), Some(3));
    }

    #[test]
    fn building_below_live_is_dropped() {
        let mut set = versions();
        set.apply(version(5, ProjectionStatus::Live));
        set.apply(version(3, ProjectionStatus::Building));

        assert_eq!(set.len(), 1);
        assert!(set.get(3).is_none());
    }

    #[test]
    fn building_above_live_is_tracked() {
        let mut set = versions();
        set.apply(version(1, ProjectionStatus::Live));
        set.apply(version(2, ProjectionStatus::Building));

        assert_eq!(set.write_targets().len(), 2);
        assert_eq!(set.building().count(), 1);
    }

    #[test]
    fn terminal_versions_are_retained_until_next_live() {
        let mut set = versions();
        set.apply(version(1, ProjectionStatus::Live));
        set.apply(version(2, ProjectionStatus::Building));
        set.apply(version(2, ProjectionStatus::Timedout));

        assert_eq!(set.len(), 2);
        assert_eq!(set.write_targets().len(), 1);

        set.apply(version(3, ProjectionStatus::Building));
        set.apply(version(3, ProjectionStatus::Live));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn empty_set_has_no_live() {
        let set = versions();
        assert!(set.live().is_none());
        assert!(set.is_empty());
        assert!(set.write_targets().is_empty());
    }

    #[test]
    fn with_status_keeps_identity() {
        let v = version(4, ProjectionStatus::Building);
        let live = v.with_status(ProjectionStatus::Live);
        assert_eq!(live.revision(), 4);
        assert_eq!(live.name(), v.name());
        assert_eq!(live.hash(), v.hash());
        assert_eq!(live.status(), ProjectionStatus::Live);
    }
}
