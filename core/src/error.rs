//! Repository error taxonomy.
//!
//! The taxonomy mirrors how failures propagate:
//!
//! | Kind | Propagation |
//! |------|-------------|
//! | `InvalidArgument` | Raised to the caller before any I/O; never swallowed. |
//! | `VersionResolution` | Failed read result; existing cache entries survive. |
//! | `WriteFailed` | Logged with a replay hint on the fan-out path; returned on targeted writes. |
//! | `ReadFailed` | Failed read result; no state mutation. |
//!
//! Memory-pressure warnings are logged at warn level and never surfaced as
//! errors.

use crate::event::EventError;
use crate::name::ProjectionName;
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the projection repository.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Malformed input: name mismatch, or a write targeting a version whose
    /// status is not write-eligible.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The version-manager projection could not be loaded.
    #[error("Failed to resolve versions for projection '{name}': {reason}")]
    VersionResolution {
        /// The projection whose versions were requested.
        name: ProjectionName,
        /// Why resolution failed.
        reason: String,
    },

    /// Persisting one `(projection_id, version)` commit failed.
    #[error(
        "Failed to persist commit for projection '{name}' revision {revision}: {reason} \
         (replay the projection to heal)"
    )]
    WriteFailed {
        /// The projection being written.
        name: ProjectionName,
        /// The revision targeted by the failed write.
        revision: u64,
        /// The underlying failure.
        reason: String,
    },

    /// A reconstruction failed; no partial state was produced.
    #[error("Failed to read projection '{name}': {reason}")]
    ReadFailed {
        /// The projection being read.
        name: ProjectionName,
        /// The underlying failure.
        reason: String,
    },

    /// A store adapter failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Event or state (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<EventError> for RepositoryError {
    fn from(e: EventError) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_failed_display_carries_replay_hint() {
        let error = RepositoryError::WriteFailed {
            name: ProjectionName::new("orders"),
            revision: 2,
            reason: "connection reset".to_string(),
        };

        let display = format!("{error}");
        assert!(display.contains("orders"));
        assert!(display.contains("revision 2"));
        assert!(display.contains("replay"));
    }

    #[test]
    fn store_error_converts() {
        let error: RepositoryError = StoreError::Backend("down".to_string()).into();
        assert!(matches!(error, RepositoryError::Store(_)));
    }
}
