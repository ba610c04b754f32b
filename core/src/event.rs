//! Domain event trait and the serialized form stored in commits.
//!
//! Events are immutable facts folded into projections. They are serialized
//! with `bincode` - compact, fast, and uniform across every store adapter -
//! and tagged with a stable, versioned type identifier so schemas can evolve
//! without breaking stored history.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event serialization.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be recorded in a projection commit and folded into a
/// projection state.
///
/// # Event Naming Convention
///
/// `event_type()` must return a stable identifier with a version suffix,
/// e.g. `"OrderPlaced.v1"`. The tag is stored alongside the payload and is
/// the only part of an event a store adapter ever interprets.
///
/// # Examples
///
/// ```
/// use statefold_core::event::DomainEvent;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// enum OrderEvent {
///     OrderPlaced { order_id: String, total_cents: u64 },
/// }
///
/// impl DomainEvent for OrderEvent {
///     fn event_type(&self) -> &'static str {
///         match self {
///             OrderEvent::OrderPlaced { .. } => "OrderPlaced.v1",
///         }
///     }
/// }
/// ```
pub trait DomainEvent: Send + Sync + 'static {
    /// Returns the stable, versioned type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes do not
    /// decode to this event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event as carried inside a projection commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// The event type identifier (e.g. `"OrderPlaced.v1"`).
    pub event_type: String,

    /// The bincode-serialized event payload.
    pub data: Vec<u8>,
}

impl SerializedEvent {
    /// Create a new serialized event from its parts.
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>) -> Self {
        Self { event_type, data }
    }

    /// Serialize a [`DomainEvent`] into its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized.
    pub fn from_event<E: DomainEvent + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
        })
    }

    /// Decode the payload back into a concrete event type.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the payload does not
    /// decode to `E`.
    pub fn decode<E: DomainEvent + DeserializeOwned>(&self) -> Result<E, EventError> {
        E::from_bytes(&self.data)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
