//! # Statefold Testing
//!
//! Testing utilities for the Statefold projection repository:
//!
//! - In-memory implementations of the commit and snapshot store traits
//! - [`stores::FlakyCommitStore`] for failure-injection tests
//! - Fixture projections ([`fixtures::AccountBalance`],
//!   [`fixtures::AccountAuditTrail`])
//! - [`mocks::FixedClock`] for deterministic timestamps
//!
//! ## Example
//!
//! ```ignore
//! let commits = Arc::new(InMemoryCommitStore::new());
//! let snapshots = Arc::new(InMemorySnapshotStore::new());
//! let registry = Arc::new(
//!     ProjectionRegistry::new(Arc::new(Xxh3SchemaHasher)).register::<AccountBalance>(),
//! );
//!
//! let repository = ProjectionRepository::new(commits.clone(), snapshots, registry)
//!     .with_clock(Arc::new(test_clock()));
//! ```

pub mod fixtures;
pub mod mocks;
pub mod stores;

pub use fixtures::{AccountAuditTrail, AccountBalance, AccountEvent};
pub use mocks::{FixedClock, test_clock};
pub use stores::{FlakyCommitStore, InMemoryCommitStore, InMemorySnapshotStore};
