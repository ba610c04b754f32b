//! The projection definition contract.
//!
//! # Overview
//!
//! A projection is a read model computed by folding events. The definition
//! supplies three capabilities:
//!
//! - **Routing**: which instances (ids) an event maps to
//! - **Folding**: how an event mutates the state
//! - **Shape**: the schema descriptor used to fingerprint revisions
//!
//! The fold is a pure, synchronous function - all I/O lives in the
//! repository and the stores. That keeps reconstruction deterministic:
//! replaying the same commits over the same snapshot always yields the same
//! state, regardless of page boundaries.
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use statefold_core::event::DomainEvent;
//! use statefold_core::id::ProjectionId;
//! use statefold_core::name::ProjectionContract;
//! use statefold_core::projection::Projection;
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum OrderEvent {
//!     OrderPlaced { order_id: String, total_cents: u64 },
//! }
//!
//! impl DomainEvent for OrderEvent {
//!     fn event_type(&self) -> &'static str {
//!         "OrderPlaced.v1"
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default, Serialize, Deserialize)]
//! struct OrderSummary {
//!     order_id: String,
//!     total_cents: u64,
//! }
//!
//! impl ProjectionContract for OrderSummary {
//!     const CONTRACT_ID: &'static str = "order_summary";
//! }
//!
//! impl Projection for OrderSummary {
//!     type Event = OrderEvent;
//!
//!     fn projection_ids(event: &OrderEvent) -> Vec<ProjectionId> {
//!         match event {
//!             OrderEvent::OrderPlaced { order_id, .. } => {
//!                 vec![ProjectionId::from(order_id.as_str())]
//!             }
//!         }
//!     }
//!
//!     fn apply(&mut self, event: &OrderEvent) {
//!         match event {
//!             OrderEvent::OrderPlaced { order_id, total_cents } => {
//!                 self.order_id.clone_from(order_id);
//!                 self.total_cents = *total_cents;
//!             }
//!         }
//!     }
//!
//!     fn state_shape() -> &'static str {
//!         "order_id:String,total_cents:u64"
//!     }
//!
//!     fn handled_events() -> &'static [&'static str] {
//!         &["OrderPlaced.v1"]
//!     }
//! }
//! ```

use crate::event::{DomainEvent, EventError};
use crate::hash::SchemaDescriptor;
use crate::id::ProjectionId;
use crate::name::ProjectionContract;
use serde::{Serialize, de::DeserializeOwned};

/// A projection definition: routing, folding, and shape for one read model.
///
/// `Default` supplies the zero state an empty stream folds to;
/// `Serialize`/`DeserializeOwned` carry the state through snapshots.
pub trait Projection:
    ProjectionContract + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The event type this projection folds.
    type Event: DomainEvent + Serialize + DeserializeOwned;

    /// The set of projection instances an event maps to.
    ///
    /// May be empty (the event is a no-op for this projection), a single id,
    /// or many.
    fn projection_ids(event: &Self::Event) -> Vec<ProjectionId>;

    /// Fold one event into the state. Pure and synchronous.
    ///
    /// # Idempotency
    ///
    /// Duplicate delivery is tolerated only to the degree this fold is
    /// idempotent; stores are recommended to deduplicate on the commit
    /// origin.
    fn apply(&mut self, event: &Self::Event);

    /// Whether reconstruction should checkpoint snapshots for this type.
    ///
    /// Non-snapshottable projections replay their full history on every
    /// read. Default is snapshottable.
    #[must_use]
    fn snapshottable() -> bool {
        true
    }

    /// Textual rendering of the state type's fields, fed to the schema
    /// hasher.
    fn state_shape() -> &'static str;

    /// Stable type tags of every event this projection folds.
    fn handled_events() -> &'static [&'static str];

    /// The schema descriptor fingerprinting this definition's shape.
    #[must_use]
    fn descriptor() -> SchemaDescriptor {
        SchemaDescriptor {
            projection_name: Self::projection_name(),
            state_shape: Self::state_shape(),
            handled_events: Self::handled_events(),
        }
    }

    /// Serialize the current state for a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the state cannot be
    /// serialized.
    fn snapshot_state(&self) -> Result<Vec<u8>, EventError> {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Rehydrate a state from snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes do not
    /// decode to this state type.
    fn from_snapshot_state(state: &[u8]) -> Result<Self, EventError> {
        bincode::deserialize(state).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}
