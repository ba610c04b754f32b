//! Store traits for the projection commit log and the snapshot store.
//!
//! Both stores are external collaborators: the repository core defines the
//! contracts, adapters implement them (`statefold-postgres` for production,
//! `statefold-testing` in memory). The traits use explicit
//! `Pin<Box<dyn Future>>` returns instead of `async fn` so they stay
//! dyn-compatible - the repository holds them as `Arc<dyn ...>`.
//!
//! # Thread Safety
//!
//! Implementations must be safe for concurrent use by multiple repository
//! instances within a process.

use crate::commit::ProjectionCommit;
use crate::id::ProjectionId;
use crate::name::ProjectionName;
use crate::snapshot::{Snapshot, SnapshotMeta};
use crate::version::ProjectionVersion;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by store trait methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors surfaced by store adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing storage failed (connection, query, I/O).
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored value could not be (de)serialized.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

/// Append-only commit log indexed by `(version, projection_id, snapshot_marker)`.
///
/// # Contract
///
/// - `append` is a durable append. Deduplicating on
///   `(projection_id, version, origin)` is recommended - the event bus
///   redelivers on failure - but the repository tolerates duplicates as long
///   as the projection's fold is idempotent.
/// - `load_page` returns all commits at the given marker in insertion order.
///   A page shorter than the strategy's page size signals end-of-log.
pub trait ProjectionCommitStore: Send + Sync {
    /// Durably append one commit.
    fn append(&self, commit: ProjectionCommit) -> StoreFuture<'_, ()>;

    /// Load the commits at one snapshot marker, in insertion order.
    fn load_page(
        &self,
        version: ProjectionVersion,
        projection_id: ProjectionId,
        snapshot_marker: u64,
    ) -> StoreFuture<'_, Vec<ProjectionCommit>>;
}

/// Key-value store of snapshots keyed by `(projection_name, projection_id, version)`.
///
/// Absent snapshots are `Ok(None)`, never an error.
pub trait SnapshotStore: Send + Sync {
    /// Load the latest snapshot, state included.
    fn load(
        &self,
        projection_name: ProjectionName,
        projection_id: ProjectionId,
        version: ProjectionVersion,
    ) -> StoreFuture<'_, Option<Snapshot>>;

    /// Load the latest snapshot's metadata only.
    fn load_meta(
        &self,
        projection_name: ProjectionName,
        projection_id: ProjectionId,
        version: ProjectionVersion,
    ) -> StoreFuture<'_, Option<SnapshotMeta>>;

    /// Persist a snapshot for a version. Racing writers at the same revision
    /// produce equal snapshots; last writer wins.
    fn save(&self, snapshot: Snapshot, version: ProjectionVersion) -> StoreFuture<'_, ()>;
}
