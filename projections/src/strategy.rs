//! Snapshot strategy - pure checkpointing policy.
//!
//! The strategy answers three questions during reconstruction and writes:
//! how many commits make a page, when a filled page should be checkpointed
//! into a snapshot, and which page index (snapshot marker) the next commit
//! belongs to.
//!
//! The marker is a deterministic function of position alone:
//! `snapshot_revision + 1 + ⌊accumulated / events_in_snapshot⌋`. Parallel
//! writers to the same `(projection_id, version)` derive the same marker for
//! commits at the same ordinal position, so the store can index commits by
//! `(version, projection_id, marker)` and serve ranged reads. Pages start at
//! `snapshot_revision + 1`: each snapshot revision absorbs exactly one full
//! page, keeping marker arithmetic aligned with the read loop.

use statefold_core::commit::ProjectionCommit;

/// Checkpointing policy over the commits accumulated since the latest
/// snapshot. Pure - no I/O, no suspension.
pub trait SnapshotStrategy: Send + Sync {
    /// Page size: the maximum number of commits one `load_page` returns and
    /// the number of commits a snapshot revision absorbs.
    fn events_in_snapshot(&self) -> usize;

    /// Whether the accumulated commits warrant a new snapshot - true when
    /// the loader just finished filling a full page.
    fn should_create_snapshot(
        &self,
        accumulated: &[ProjectionCommit],
        _snapshot_revision: u64,
    ) -> bool {
        accumulated.len() >= self.events_in_snapshot()
    }

    /// The page index into which the next commit must be written, given the
    /// commits accumulated since the snapshot at `snapshot_revision`.
    fn snapshot_marker(&self, accumulated: &[ProjectionCommit], snapshot_revision: u64) -> u64 {
        // usize → u64 is lossless on every supported platform.
        #[allow(clippy::cast_possible_truncation)]
        let filled_pages = (accumulated.len() / self.events_in_snapshot()) as u64;
        snapshot_revision + 1 + filled_pages
    }
}

/// Default [`SnapshotStrategy`]: fixed event count per page.
#[derive(Clone, Copy, Debug)]
pub struct EventCountStrategy {
    events_in_snapshot: usize,
}

impl EventCountStrategy {
    /// Create a strategy with the given page size.
    ///
    /// # Panics
    ///
    /// Panics if `events_in_snapshot` is zero.
    #[must_use]
    #[allow(clippy::panic)] // A zero page size is a construction bug, not a runtime condition
    pub fn new(events_in_snapshot: usize) -> Self {
        assert!(events_in_snapshot > 0, "page size must be positive");
        Self { events_in_snapshot }
    }
}

impl Default for EventCountStrategy {
    /// 500 events per snapshot page.
    fn default() -> Self {
        Self {
            events_in_snapshot: 500,
        }
    }
}

impl SnapshotStrategy for EventCountStrategy {
    fn events_in_snapshot(&self) -> usize {
        self.events_in_snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use statefold_core::event::SerializedEvent;
    use statefold_core::hash::SchemaHash;
    use statefold_core::id::ProjectionId;
    use statefold_core::name::ProjectionName;
    use statefold_core::origin::EventOrigin;
    use statefold_core::version::{ProjectionStatus, ProjectionVersion};

    fn commits(count: usize) -> Vec<ProjectionCommit> {
        let version = ProjectionVersion::new(
            ProjectionName::new("orders"),
            ProjectionStatus::Live,
            1,
            SchemaHash::new(1),
        );
        (0..count)
            .map(|i| {
                ProjectionCommit::new(
                    ProjectionId::from("a"),
                    version.clone(),
                    SerializedEvent::new("E.v1".to_string(), vec![]),
                    1,
                    EventOrigin::new("agg".to_string(), i as u64, 0, Utc::now()),
                    Utc::now(),
                )
            })
            .collect()
    }

    #[test]
    fn first_page_starts_above_snapshot_revision() {
        let strategy = EventCountStrategy::new(3);
        assert_eq!(strategy.snapshot_marker(&commits(0), 0), 1);
        assert_eq!(strategy.snapshot_marker(&commits(0), 7), 8);
    }

    #[test]
    fn marker_advances_every_full_page() {
        let strategy = EventCountStrategy::new(3);
        assert_eq!(strategy.snapshot_marker(&commits(1), 0), 1);
        assert_eq!(strategy.snapshot_marker(&commits(2), 0), 1);
        assert_eq!(strategy.snapshot_marker(&commits(3), 0), 2);
        assert_eq!(strategy.snapshot_marker(&commits(5), 0), 2);
        assert_eq!(strategy.snapshot_marker(&commits(6), 0), 3);
    }

    #[test]
    fn marker_is_position_invariant_across_checkpoints() {
        // The marker for a commit at a fixed ordinal position must not
        // depend on whether a checkpoint happened in between: observing
        // (rev, accumulated) or (rev + 1, accumulated - page) is equivalent.
        let strategy = EventCountStrategy::new(3);
        assert_eq!(
            strategy.snapshot_marker(&commits(4), 0),
            strategy.snapshot_marker(&commits(1), 1),
        );
        assert_eq!(
            strategy.snapshot_marker(&commits(7), 2),
            strategy.snapshot_marker(&commits(1), 4),
        );
    }

    #[test]
    fn should_snapshot_only_on_full_page() {
        let strategy = EventCountStrategy::new(3);
        assert!(!strategy.should_create_snapshot(&commits(2), 0));
        assert!(strategy.should_create_snapshot(&commits(3), 0));
        assert!(strategy.should_create_snapshot(&commits(4), 0));
    }

    #[test]
    #[should_panic(expected = "page size must be positive")]
    fn zero_page_size_rejected() {
        let _ = EventCountStrategy::new(0);
    }
}
