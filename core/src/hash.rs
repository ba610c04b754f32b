//! Schema fingerprinting for projection definitions.
//!
//! A projection version records a content hash of the definition's shape
//! (state fields plus handled events). Two versions at the same revision must
//! carry the same hash; a differing hash signals a schema change and requires
//! a new revision. Hashing uses XXH3 - a stable, formally specified algorithm
//! that will not change between library versions.

use crate::name::ProjectionName;
use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// Content-addressed fingerprint of a projection definition's shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaHash(u64);

impl SchemaHash {
    /// Create a schema hash from a raw value.
    ///
    /// Normally hashes come from a [`SchemaHasher`]; the raw constructor
    /// exists for tests and for rehydrating persisted versions.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw hash value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SchemaHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The hashable shape of a projection definition.
///
/// The descriptor captures everything that makes two revisions of a
/// projection structurally compatible: the contract id, a textual rendering
/// of the state shape, and the set of handled event types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaDescriptor {
    /// The projection's contract id.
    pub projection_name: ProjectionName,
    /// Textual rendering of the state type's fields.
    pub state_shape: &'static str,
    /// Stable type tags of every event the projection folds.
    pub handled_events: &'static [&'static str],
}

impl SchemaDescriptor {
    /// Canonical byte rendering fed to the hasher.
    ///
    /// Event tags are sorted so declaration order does not change the hash.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut events: Vec<&str> = self.handled_events.to_vec();
        events.sort_unstable();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(self.projection_name.as_str().as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(self.state_shape.as_bytes());
        for event in events {
            bytes.push(b'\n');
            bytes.extend_from_slice(event.as_bytes());
        }
        bytes
    }
}

/// Computes a stable content hash of a projection definition.
///
/// Injected so deployments can swap the algorithm; the default is
/// [`Xxh3SchemaHasher`].
pub trait SchemaHasher: Send + Sync {
    /// Hash the given descriptor.
    fn hash(&self, descriptor: &SchemaDescriptor) -> SchemaHash;
}

/// Default [`SchemaHasher`] backed by 64-bit XXH3.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh3SchemaHasher;

impl SchemaHasher for Xxh3SchemaHasher {
    fn hash(&self, descriptor: &SchemaDescriptor) -> SchemaHash {
        SchemaHash(xxh3_64(&descriptor.canonical_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(events: &'static [&'static str]) -> SchemaDescriptor {
        SchemaDescriptor {
            projection_name: ProjectionName::new("order_summary"),
            state_shape: "order_id:String,total_cents:u64",
            handled_events: events,
        }
    }

    #[test]
    fn equal_descriptors_hash_equal() {
        let hasher = Xxh3SchemaHasher;
        let a = hasher.hash(&descriptor(&["OrderPlaced.v1", "OrderShipped.v1"]));
        let b = hasher.hash(&descriptor(&["OrderPlaced.v1", "OrderShipped.v1"]));
        assert_eq!(a, b);
    }

    #[test]
    fn event_order_does_not_change_hash() {
        let hasher = Xxh3SchemaHasher;
        let a = hasher.hash(&descriptor(&["OrderPlaced.v1", "OrderShipped.v1"]));
        let b = hasher.hash(&descriptor(&["OrderShipped.v1", "OrderPlaced.v1"]));
        assert_eq!(a, b);
    }

    #[test]
    fn added_event_changes_hash() {
        let hasher = Xxh3SchemaHasher;
        let a = hasher.hash(&descriptor(&["OrderPlaced.v1"]));
        let b = hasher.hash(&descriptor(&["OrderPlaced.v1", "OrderShipped.v1"]));
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_fixed_width_hex() {
        let hash = SchemaHash::new(0xab);
        assert_eq!(format!("{hash}"), "00000000000000ab");
    }
}
