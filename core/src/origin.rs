//! Event origin - a globally addressable pointer into the event store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pointer to the originating event in the event store.
///
/// `(aggregate_id, aggregate_revision, event_position)` addresses one event
/// globally and serves as the idempotency key for a projection commit: the
/// event bus may redeliver, and stores deduplicate appends per
/// `(projection_id, version, origin)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOrigin {
    aggregate_id: String,
    aggregate_revision: u64,
    event_position: u64,
    timestamp: DateTime<Utc>,
}

impl EventOrigin {
    /// Create a new event origin.
    #[must_use]
    pub const fn new(
        aggregate_id: String,
        aggregate_revision: u64,
        event_position: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_revision,
            event_position,
            timestamp,
        }
    }

    /// The id of the aggregate root that produced the event.
    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    /// The aggregate revision the event was committed at.
    #[must_use]
    pub const fn aggregate_revision(&self) -> u64 {
        self.aggregate_revision
    }

    /// The event's position within its aggregate commit.
    #[must_use]
    pub const fn event_position(&self) -> u64 {
        self.event_position
    }

    /// When the originating event was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Deduplication key: the address without the timestamp.
    ///
    /// Redeliveries of the same event may carry different timestamps; only
    /// the address identifies the event.
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        format!(
            "{}#{}#{}",
            self.aggregate_id, self.aggregate_revision, self.event_position
        )
    }
}

impl fmt::Display for EventOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}",
            self.aggregate_id, self.aggregate_revision, self.event_position
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_key_ignores_timestamp() {
        let a = EventOrigin::new("order-1".to_string(), 3, 0, Utc::now());
        let b = EventOrigin::new("order-1".to_string(), 3, 0, Utc::now());
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn dedupe_key_distinguishes_positions() {
        let now = Utc::now();
        let a = EventOrigin::new("order-1".to_string(), 3, 0, now);
        let b = EventOrigin::new("order-1".to_string(), 3, 1, now);
        assert_ne!(a.dedupe_key(), b.dedupe_key());
    }
}
