//! # Statefold Core
//!
//! Core traits and types for the Statefold projection repository - the read
//! side of an event-sourced CQRS runtime.
//!
//! This crate defines the domain model the repository operates on:
//!
//! - **Identity**: [`name::ProjectionName`] (contract ids),
//!   [`id::ProjectionId`] (instances), [`name::Tenant`] (isolation scope)
//! - **Lifecycle**: [`version::ProjectionVersion`] and friends - named,
//!   hashed, status-tagged generations of a projection
//! - **History**: [`commit::ProjectionCommit`] (the per-projection commit
//!   log entry) and [`snapshot::Snapshot`] (checkpointed state)
//! - **Contracts**: [`projection::Projection`] (the definition: routing +
//!   fold + shape), [`store::ProjectionCommitStore`] and
//!   [`store::SnapshotStore`] (external storage), [`hash::SchemaHasher`]
//!   (schema fingerprinting), [`clock::Clock`]
//!
//! The repository itself - stream loading, version resolution, fan-out
//! writes - lives in `statefold-projections`.

pub mod clock;
pub mod commit;
pub mod error;
pub mod event;
pub mod hash;
pub mod id;
pub mod name;
pub mod origin;
pub mod projection;
pub mod snapshot;
pub mod store;
pub mod version;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub use clock::{Clock, SystemClock};
pub use commit::ProjectionCommit;
pub use error::{RepositoryError, Result};
pub use event::{DomainEvent, SerializedEvent};
pub use hash::{SchemaDescriptor, SchemaHash, SchemaHasher, Xxh3SchemaHasher};
pub use id::ProjectionId;
pub use name::{ProjectionContract, ProjectionName, Tenant};
pub use origin::EventOrigin;
pub use projection::Projection;
pub use snapshot::{Snapshot, SnapshotMeta};
pub use store::{ProjectionCommitStore, SnapshotStore, StoreError, StoreFuture};
pub use version::{ProjectionStatus, ProjectionVersion, ProjectionVersions};
