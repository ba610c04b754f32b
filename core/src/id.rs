//! Opaque projection instance identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque byte identifier selecting a single instance of a projection.
///
/// One `ProjectionId` addresses one row of a read model. The repository
/// treats ids as opaque bytes; how they are derived (aggregate id, composite
/// key, hash) is the projection definition's business.
///
/// # Examples
///
/// ```
/// use statefold_core::id::ProjectionId;
///
/// let id = ProjectionId::from("order-123");
/// assert_eq!(id.as_bytes(), b"order-123");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectionId(Vec<u8>);

impl ProjectionId {
    /// Create a new `ProjectionId` from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the identifier as raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert the identifier into its inner byte vector.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Display for ProjectionId {
    /// Renders as UTF-8 when the bytes allow it, lowercase hex otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            },
        }
    }
}

impl From<&str> for ProjectionId {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for ProjectionId {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for ProjectionId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ProjectionId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_utf8() {
        let id = ProjectionId::from("order-123");
        assert_eq!(format!("{id}"), "order-123");
    }

    #[test]
    fn display_non_utf8_as_hex() {
        let id = ProjectionId::new(vec![0xff, 0x00, 0xab]);
        assert_eq!(format!("{id}"), "ff00ab");
    }

    #[test]
    fn equality_is_byte_equality() {
        assert_eq!(ProjectionId::from("a"), ProjectionId::new(vec![b'a']));
        assert_ne!(ProjectionId::from("a"), ProjectionId::from("A"));
    }
}
