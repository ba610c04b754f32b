//! Startup registry of projection definitions.
//!
//! The registry is the capability set built once at startup from every
//! projection definition the process serves: contract id, schema
//! fingerprint, snapshottability, handled events. The repository uses it to
//! detect schema drift - a resolved version whose hash disagrees with the
//! registered definition means the code changed shape without a new
//! revision being requested.

use statefold_core::hash::{SchemaHash, SchemaHasher};
use statefold_core::name::ProjectionName;
use statefold_core::projection::Projection;
use std::collections::HashMap;

/// One registered projection definition.
#[derive(Clone, Debug)]
pub struct RegisteredProjection {
    name: ProjectionName,
    hash: SchemaHash,
    snapshottable: bool,
    handled_events: &'static [&'static str],
}

impl RegisteredProjection {
    /// The contract id.
    #[must_use]
    pub const fn name(&self) -> &ProjectionName {
        &self.name
    }

    /// The schema fingerprint of the registered definition.
    #[must_use]
    pub const fn hash(&self) -> SchemaHash {
        self.hash
    }

    /// Whether reconstruction checkpoints snapshots for this definition.
    #[must_use]
    pub const fn snapshottable(&self) -> bool {
        self.snapshottable
    }

    /// Stable type tags of the events the definition folds.
    #[must_use]
    pub const fn handled_events(&self) -> &'static [&'static str] {
        self.handled_events
    }
}

/// Registry of folders keyed by projection name, built at startup.
///
/// # Example
///
/// ```ignore
/// let registry = ProjectionRegistry::new(Arc::new(Xxh3SchemaHasher))
///     .register::<OrderSummary>()
///     .register::<CustomerHistory>();
/// ```
pub struct ProjectionRegistry {
    hasher: std::sync::Arc<dyn SchemaHasher>,
    entries: HashMap<ProjectionName, RegisteredProjection>,
}

impl ProjectionRegistry {
    /// Create an empty registry hashing with the given hasher.
    #[must_use]
    pub fn new(hasher: std::sync::Arc<dyn SchemaHasher>) -> Self {
        Self {
            hasher,
            entries: HashMap::new(),
        }
    }

    /// Register a projection definition, computing its schema hash.
    #[must_use]
    pub fn register<P: Projection>(mut self) -> Self {
        let descriptor = P::descriptor();
        let entry = RegisteredProjection {
            name: descriptor.projection_name.clone(),
            hash: self.hasher.hash(&descriptor),
            snapshottable: P::snapshottable(),
            handled_events: descriptor.handled_events,
        };
        self.entries.insert(entry.name.clone(), entry);
        self
    }

    /// Look up a registered definition by name.
    #[must_use]
    pub fn get(&self, name: &ProjectionName) -> Option<&RegisteredProjection> {
        self.entries.get(name)
    }

    /// The registered schema hash for a name, if registered.
    #[must_use]
    pub fn schema_hash(&self, name: &ProjectionName) -> Option<SchemaHash> {
        self.entries.get(name).map(RegisteredProjection::hash)
    }

    /// All registered names.
    pub fn names(&self) -> impl Iterator<Item = &ProjectionName> {
        self.entries.keys()
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
