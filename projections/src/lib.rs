//! # Statefold Projections
//!
//! The projection repository core: persists observed events into
//! per-projection commit logs, reconstructs read-model state by folding
//! commit history on top of snapshots, and manages the projection version
//! lifecycle so a live reader never observes a half-built rebuild.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ ProjectionRepository │  save (fan-out / targeted), get
//! └───┬──────────────┬───┘
//!     │              │
//!     ▼              ▼
//! ┌─────────────┐ ┌──────────────┐     ┌──────────────┐
//! │StreamLoader │ │VersionResolver├────▶│ VersionCache │
//! └───┬─────┬───┘ └───────┬──────┘     └──────────────┘
//!     │     │             │ replays
//!     ▼     ▼             ▼
//! ┌───────┐ ┌────────┐ ┌──────────────────┐
//! │Commit │ │Snapshot│ │ VersionLifecycle │  (a projection
//! │ store │ │ store  │ │    projection    │   about projections)
//! └───────┘ └────────┘ └──────────────────┘
//! ```
//!
//! Store traits and domain types live in `statefold-core`; adapters live in
//! `statefold-postgres` (production) and `statefold-testing` (in-memory).

pub mod cache;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod repository;
pub mod resolver;
pub mod strategy;
pub mod stream;

// Re-export main types for convenience
pub use cache::VersionCache;
pub use loader::StreamLoader;
pub use manager::{VersionLifecycle, VersionLifecycleEvent, manager_version, version_manager_id};
pub use registry::{ProjectionRegistry, RegisteredProjection};
pub use repository::ProjectionRepository;
pub use resolver::{DEFAULT_REFRESH_AFTER, VersionResolver};
pub use strategy::{EventCountStrategy, SnapshotStrategy};
pub use stream::{ProjectionStream, SnapshotSource, fold_commits};
