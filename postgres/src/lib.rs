//! `PostgreSQL` adapters for the Statefold stores.
//!
//! # Overview
//!
//! Production implementations of the store traits from `statefold-core`:
//!
//! - [`PostgresCommitStore`]: append-only commit log in the
//!   `projection_commits` table, paged by
//!   `(version, projection_id, snapshot_marker)`. A serial column preserves
//!   insertion order within a page; a unique index over the commit origin
//!   deduplicates event-bus redeliveries (`ON CONFLICT DO NOTHING`).
//! - [`PostgresSnapshotStore`]: one snapshot slot per
//!   `(projection_name, projection_id, version)` in `projection_snapshots`,
//!   last writer wins.
//!
//! Both adapters are safe for concurrent use by multiple repository
//! instances; they share a connection pool.
//!
//! # Example
//!
//! ```ignore
//! use statefold_postgres::{PostgresCommitStore, PostgresSnapshotStore};
//!
//! let commits = PostgresCommitStore::connect("postgres://localhost/projections").await?;
//! commits.migrate().await?;
//! let snapshots = PostgresSnapshotStore::new(commits.pool().clone());
//! ```

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use statefold_core::commit::ProjectionCommit;
use statefold_core::event::SerializedEvent;
use statefold_core::hash::SchemaHash;
use statefold_core::id::ProjectionId;
use statefold_core::name::ProjectionName;
use statefold_core::origin::EventOrigin;
use statefold_core::snapshot::{Snapshot, SnapshotMeta};
use statefold_core::store::{
    ProjectionCommitStore, SnapshotStore, StoreError, StoreFuture,
};
use statefold_core::version::{ProjectionStatus, ProjectionVersion};

fn status_to_str(status: ProjectionStatus) -> &'static str {
    match status {
        ProjectionStatus::New => "new",
        ProjectionStatus::Building => "building",
        ProjectionStatus::Live => "live",
        ProjectionStatus::Canceled => "canceled",
        ProjectionStatus::Timedout => "timedout",
    }
}

fn status_from_str(s: &str) -> Result<ProjectionStatus, StoreError> {
    match s {
        "new" => Ok(ProjectionStatus::New),
        "building" => Ok(ProjectionStatus::Building),
        "live" => Ok(ProjectionStatus::Live),
        "canceled" => Ok(ProjectionStatus::Canceled),
        "timedout" => Ok(ProjectionStatus::Timedout),
        other => Err(StoreError::Serialization(format!(
            "unknown projection status '{other}'"
        ))),
    }
}

// SchemaHash is u64 but PostgreSQL BIGINT is i64. The bit pattern is
// preserved through the round-trip; ordering is irrelevant for a hash.
#[allow(clippy::cast_possible_wrap)]
const fn hash_to_i64(hash: SchemaHash) -> i64 {
    hash.value() as i64
}

#[allow(clippy::cast_sign_loss)]
const fn hash_from_i64(value: i64) -> SchemaHash {
    SchemaHash::new(value as u64)
}

// Revisions, markers, and positions are non-negative and far below
// i64::MAX; the casts cannot wrap in practice.
#[allow(clippy::cast_possible_wrap)]
const fn u64_to_i64(value: u64) -> i64 {
    value as i64
}

#[allow(clippy::cast_sign_loss)]
const fn u64_from_i64(value: i64) -> u64 {
    value as u64
}

fn backend_error(context: &str, e: &sqlx::Error) -> StoreError {
    StoreError::Backend(format!("{context}: {e}"))
}

/// PostgreSQL-backed projection commit log.
#[derive(Clone)]
pub struct PostgresCommitStore {
    pool: PgPool,
}

impl PostgresCommitStore {
    /// Create a commit store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool to the given database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| backend_error("failed to connect", &e))?;
        Ok(Self::new(pool))
    }

    /// Run the projection table migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying connection pool, for sharing with the snapshot store.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

type CommitRow = (
    String,                // event_type
    Vec<u8>,               // event_data
    String,                // version_status
    i64,                   // version_hash
    String,                // origin_aggregate_id
    i64,                   // origin_aggregate_revision
    i64,                   // origin_event_position
    DateTime<Utc>,         // origin_timestamp
    DateTime<Utc>,         // persisted_at
);

impl ProjectionCommitStore for PostgresCommitStore {
    fn append(&self, commit: ProjectionCommit) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO projection_commits (
                     projection_id, version_name, version_revision, version_status,
                     version_hash, snapshot_marker, event_type, event_data,
                     origin_aggregate_id, origin_aggregate_revision,
                     origin_event_position, origin_timestamp, persisted_at
                 )
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                 ON CONFLICT (projection_id, version_name, version_revision,
                              origin_aggregate_id, origin_aggregate_revision,
                              origin_event_position)
                 DO NOTHING",
            )
            .bind(commit.projection_id().as_bytes())
            .bind(commit.version().name().as_str())
            .bind(u64_to_i64(commit.version().revision()))
            .bind(status_to_str(commit.version().status()))
            .bind(hash_to_i64(commit.version().hash()))
            .bind(u64_to_i64(commit.snapshot_marker()))
            .bind(&commit.event().event_type)
            .bind(&commit.event().data)
            .bind(commit.origin().aggregate_id())
            .bind(u64_to_i64(commit.origin().aggregate_revision()))
            .bind(u64_to_i64(commit.origin().event_position()))
            .bind(commit.origin().timestamp())
            .bind(commit.persisted_at())
            .execute(&self.pool)
            .await
            .map_err(|e| backend_error("failed to append commit", &e))?;

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
            let rows: Vec<CommitRow> = sqlx::query_as(
                "SELECT event_type, event_data, version_status, version_hash,
                        origin_aggregate_id, origin_aggregate_revision,
                        origin_event_position, origin_timestamp, persisted_at
                 FROM projection_commits
                 WHERE version_name = $1
                   AND version_revision = $2
                   AND projection_id = $3
                   AND snapshot_marker = $4
                 ORDER BY id",
            )
            .bind(version.name().as_str())
            .bind(u64_to_i64(version.revision()))
            .bind(projection_id.as_bytes())
            .bind(u64_to_i64(snapshot_marker))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| backend_error("failed to load page", &e))?;

            rows.into_iter()
                .map(
                    |(
                        event_type,
                        event_data,
                        status,
                        hash,
                        aggregate_id,
                        aggregate_revision,
                        event_position,
                        origin_timestamp,
                        persisted_at,
                    )| {
                        let row_version = ProjectionVersion::new(
                            version.name().clone(),
                            status_from_str(&status)?,
                            version.revision(),
                            hash_from_i64(hash),
                        );
                        Ok(ProjectionCommit::new(
                            projection_id.clone(),
                            row_version,
                            SerializedEvent::new(event_type, event_data),
                            snapshot_marker,
                            EventOrigin::new(
                                aggregate_id,
                                u64_from_i64(aggregate_revision),
                                u64_from_i64(event_position),
                                origin_timestamp,
                            ),
                            persisted_at,
                        ))
                    },
                )
                .collect()
        })
    }
}

/// PostgreSQL-backed snapshot store.
#[derive(Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    /// Create a snapshot store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool to the given database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| backend_error("failed to connect", &e))?;
        Ok(Self::new(pool))
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SnapshotStore for PostgresSnapshotStore {
    fn load(
        &self,
        projection_name: ProjectionName,
        projection_id: ProjectionId,
        version: ProjectionVersion,
    ) -> StoreFuture<'_, Option<Snapshot>> {
        Box::pin(async move {
            let row: Option<(i64, Vec<u8>)> = sqlx::query_as(
                "SELECT snapshot_revision, state
                 FROM projection_snapshots
                 WHERE projection_name = $1
                   AND projection_id = $2
                   AND version_revision = $3",
            )
            .bind(projection_name.as_str())
            .bind(projection_id.as_bytes())
            .bind(u64_to_i64(version.revision()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error("failed to load snapshot", &e))?;

            Ok(row.map(|(revision, state)| {
                Snapshot::new(
                    projection_id.clone(),
                    projection_name.clone(),
                    state,
                    u64_from_i64(revision),
                )
            }))
        })
    }

    fn load_meta(
        &self,
        projection_name: ProjectionName,
        projection_id: ProjectionId,
        version: ProjectionVersion,
    ) -> StoreFuture<'_, Option<SnapshotMeta>> {
        Box::pin(async move {
            let row: Option<(i64,)> = sqlx::query_as(
                "SELECT snapshot_revision
                 FROM projection_snapshots
                 WHERE projection_name = $1
                   AND projection_id = $2
                   AND version_revision = $3",
            )
            .bind(projection_name.as_str())
            .bind(projection_id.as_bytes())
            .bind(u64_to_i64(version.revision()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error("failed to load snapshot meta", &e))?;

            Ok(row.map(|(revision,)| {
                SnapshotMeta::new(
                    projection_id.clone(),
                    projection_name.clone(),
                    u64_from_i64(revision),
                )
            }))
        })
    }

    fn save(&self, snapshot: Snapshot, version: ProjectionVersion) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO projection_snapshots (
                     projection_name, projection_id, version_revision,
                     snapshot_revision, state, saved_at
                 )
                 VALUES ($1, $2, $3, $4, $5, now())
                 ON CONFLICT (projection_name, projection_id, version_revision)
                 DO UPDATE SET snapshot_revision = EXCLUDED.snapshot_revision,
                               state = EXCLUDED.state,
                               saved_at = now()",
            )
            .bind(snapshot.projection_name().as_str())
            .bind(snapshot.projection_id().as_bytes())
            .bind(u64_to_i64(version.revision()))
            .bind(u64_to_i64(snapshot.revision()))
            .bind(snapshot.state())
            .execute(&self.pool)
            .await
            .map_err(|e| backend_error("failed to save snapshot", &e))?;

            tracing::debug!(
                projection = %snapshot.projection_name(),
                id = %snapshot.projection_id(),
                revision = snapshot.revision(),
                "Snapshot persisted"
            );
            Ok(())
        })
    }
}
