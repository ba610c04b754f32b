//! In-memory store implementations for fast, deterministic tests.
//!
//! - [`InMemoryCommitStore`]: commit log over a `BTreeMap`, preserving
//!   insertion order per page and deduplicating on the commit origin
//! - [`InMemorySnapshotStore`]: last-writer-wins snapshot slots
//! - [`FlakyCommitStore`]: wrapper injecting append failures, for
//!   failure-isolation tests
//!
//! Both stores record their traffic (`appended`, `load_count_for`,
//! `save_log`) so tests can assert on I/O, not just on state.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use statefold_core::commit::ProjectionCommit;
use statefold_core::id::ProjectionId;
use statefold_core::name::ProjectionName;
use statefold_core::snapshot::{Snapshot, SnapshotMeta};
use statefold_core::store::{
    ProjectionCommitStore, SnapshotStore, StoreError, StoreFuture,
};
use statefold_core::version::ProjectionVersion;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

/// Key addressing one page of the commit log:
/// `(name, revision, projection id, snapshot marker)`.
type PageKey = (String, u64, Vec<u8>, u64);

/// Key addressing one version's log for a projection instance.
type LogKey = (String, u64, Vec<u8>);

fn page_key(version: &ProjectionVersion, id: &ProjectionId, marker: u64) -> PageKey {
    (
        version.name().as_str().to_string(),
        version.revision(),
        id.as_bytes().to_vec(),
        marker,
    )
}

fn log_key(version: &ProjectionVersion, id: &ProjectionId) -> LogKey {
    (
        version.name().as_str().to_string(),
        version.revision(),
        id.as_bytes().to_vec(),
    )
}

/// In-memory commit log for fast, deterministic testing.
///
/// Deduplicates appends on `(projection_id, version, origin)` the way the
/// Postgres adapter does, and keeps an append log plus per-id load counters
/// for test assertions.
#[derive(Clone, Default)]
pub struct InMemoryCommitStore {
    pages: Arc<RwLock<BTreeMap<PageKey, Vec<ProjectionCommit>>>>,
    seen_origins: Arc<RwLock<HashSet<(LogKey, String)>>>,
    append_log: Arc<RwLock<Vec<ProjectionCommit>>>,
    page_loads: Arc<RwLock<Vec<(ProjectionId, u64)>>>,
}

impl InMemoryCommitStore {
    /// Create an empty commit store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every accepted append, in insertion order.
    #[must_use]
    pub fn appended(&self) -> Vec<ProjectionCommit> {
        self.append_log.read().unwrap().clone()
    }

    /// Accepted appends for one `(version, projection id)` log, in insertion
    /// order.
    #[must_use]
    pub fn appended_for(&self, version: &ProjectionVersion, id: &ProjectionId) -> Vec<ProjectionCommit> {
        self.append_log
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.version() == version && c.projection_id() == id)
            .cloned()
            .collect()
    }

    /// Total number of accepted appends.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.append_log.read().unwrap().len()
    }

    /// How many pages were loaded for one projection instance.
    #[must_use]
    pub fn load_count_for(&self, id: &ProjectionId) -> usize {
        self.page_loads
            .read()
            .unwrap()
            .iter()
            .filter(|(loaded, _)| loaded == id)
            .count()
    }

    /// Clear all commits and counters (for test isolation).
    pub fn clear(&self) {
        self.pages.write().unwrap().clear();
        self.seen_origins.write().unwrap().clear();
        self.append_log.write().unwrap().clear();
        self.page_loads.write().unwrap().clear();
    }
}

impl ProjectionCommitStore for InMemoryCommitStore {
    fn append(&self, commit: ProjectionCommit) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let dedupe = (
                log_key(commit.version(), commit.projection_id()),
                commit.origin().dedupe_key(),
            );
            if !self.seen_origins.write().unwrap().insert(dedupe) {
                // Redelivery: already applied to this (id, version).
                return Ok(());
            }

            let key = page_key(
                commit.version(),
                commit.projection_id(),
                commit.snapshot_marker(),
            );
            self.append_log.write().unwrap().push(commit.clone());
            self.pages.write().unwrap().entry(key).or_default().push(commit);
            Ok(())
        })
    }

    fn load_page(
        &self,
        version: ProjectionVersion,
        projection_id: ProjectionId,
        snapshot_marker: u64,
    ) -> StoreFuture<'_, Vec<ProjectionCommit>> {
        Box::pin(async move {
            self.page_loads
                .write()
                .unwrap()
                .push((projection_id.clone(), snapshot_marker));

            let key = page_key(&version, &projection_id, snapshot_marker);
            Ok(self
                .pages
                .read()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or_default())
        })
    }
}

/// Key addressing one snapshot slot: `(name, projection id, revision)` of
/// the version.
type SnapshotKey = (String, Vec<u8>, u64);

/// In-memory snapshot store with last-writer-wins slots.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    slots: Arc<RwLock<BTreeMap<SnapshotKey, Snapshot>>>,
    save_log: Arc<RwLock<Vec<(ProjectionId, u64)>>>,
}

impl InMemorySnapshotStore {
    /// Create an empty snapshot store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every snapshot save as `(projection id, snapshot revision)`, in
    /// write order.
    #[must_use]
    pub fn save_log(&self) -> Vec<(ProjectionId, u64)> {
        self.save_log.read().unwrap().clone()
    }

    /// Number of snapshot saves observed.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.save_log.read().unwrap().len()
    }

    /// Clear all snapshots and counters.
    pub fn clear(&self) {
        self.slots.write().unwrap().clear();
        self.save_log.write().unwrap().clear();
    }
}

fn snapshot_key(
    name: &ProjectionName,
    id: &ProjectionId,
    version: &ProjectionVersion,
) -> SnapshotKey {
    (
        name.as_str().to_string(),
        id.as_bytes().to_vec(),
        version.revision(),
    )
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(
        &self,
        projection_name: ProjectionName,
        projection_id: ProjectionId,
        version: ProjectionVersion,
    ) -> StoreFuture<'_, Option<Snapshot>> {
        Box::pin(async move {
            let key = snapshot_key(&projection_name, &projection_id, &version);
            Ok(self.slots.read().unwrap().get(&key).cloned())
        })
    }

    fn load_meta(
        &self,
        projection_name: ProjectionName,
        projection_id: ProjectionId,
        version: ProjectionVersion,
    ) -> StoreFuture<'_, Option<SnapshotMeta>> {
        Box::pin(async move {
            let key = snapshot_key(&projection_name, &projection_id, &version);
            Ok(self.slots.read().unwrap().get(&key).map(Snapshot::meta))
        })
    }

    fn save(&self, snapshot: Snapshot, version: ProjectionVersion) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let key = snapshot_key(snapshot.projection_name(), snapshot.projection_id(), &version);
            self.save_log
                .write()
                .unwrap()
                .push((snapshot.projection_id().clone(), snapshot.revision()));
            self.slots.write().unwrap().insert(key, snapshot);
            Ok(())
        })
    }
}

/// Commit store wrapper that injects failures.
///
/// By default only appends matching the predicate fail and reads pass
/// through untouched; [`FlakyCommitStore::failing_loads`] flips page loads
/// to fail as well. Used to verify failure isolation on the fan-out path
/// and the resolver's retain-on-failure policy.
///
/// # Example
///
/// ```ignore
/// let flaky = FlakyCommitStore::fail_revision(inner, 2);
/// // Appends targeting revision 2 now fail; everything else succeeds.
/// ```
pub struct FlakyCommitStore {
    inner: Arc<dyn ProjectionCommitStore>,
    fail_when: Box<dyn Fn(&ProjectionCommit) -> bool + Send + Sync>,
    fail_loads: Arc<RwLock<bool>>,
}

impl FlakyCommitStore {
    /// Wrap a store, failing appends for which `fail_when` returns true.
    #[must_use]
    pub fn new(
        inner: Arc<dyn ProjectionCommitStore>,
        fail_when: impl Fn(&ProjectionCommit) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            fail_when: Box::new(fail_when),
            fail_loads: Arc::new(RwLock::new(false)),
        }
    }

    /// Wrap a store, failing every append that targets the given revision.
    #[must_use]
    pub fn fail_revision(inner: Arc<dyn ProjectionCommitStore>, revision: u64) -> Self {
        Self::new(inner, move |commit| commit.version().revision() == revision)
    }

    /// Toggle page-load failures at runtime.
    pub fn failing_loads(&self, failing: bool) {
        *self.fail_loads.write().unwrap() = failing;
    }
}

impl ProjectionCommitStore for FlakyCommitStore {
    fn append(&self, commit: ProjectionCommit) -> StoreFuture<'_, ()> {
        if (self.fail_when)(&commit) {
            return Box::pin(async { Err(StoreError::Backend("injected append failure".to_string())) });
        }
        self.inner.append(commit)
    }

    fn load_page(
        &self,
        version: ProjectionVersion,
        projection_id: ProjectionId,
        snapshot_marker: u64,
    ) -> StoreFuture<'_, Vec<ProjectionCommit>> {
        if *self.fail_loads.read().unwrap() {
            return Box::pin(async { Err(StoreError::Backend("injected load failure".to_string())) });
        }
        self.inner.load_page(version, projection_id, snapshot_marker)
    }
}
