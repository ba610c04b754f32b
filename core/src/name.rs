//! Projection naming and contract identification.
//!
//! Every projection type carries a stable string identifier (its contract id)
//! that names it in the commit log, the snapshot store and the version
//! manager. Names compare case-insensitively; `ProjectionName` normalizes to
//! lowercase at construction so equality and hashing stay derived.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `ProjectionName` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid projection name: {0}")]
pub struct ParseProjectionNameError(String);

/// Stable, case-insensitive identifier of a projection type.
///
/// A projection name identifies the *type* of a read model (e.g.
/// `"order_summary"`), not an instance of it - instances are addressed by
/// [`ProjectionId`](crate::id::ProjectionId). Two names that differ only in
/// case are the same name.
///
/// # Validation
///
/// - `FromStr::from_str()`: validates input (rejects empty strings)
/// - `new()`: no validation, for application-controlled input such as
///   [`ProjectionContract::CONTRACT_ID`]
///
/// # Examples
///
/// ```
/// use statefold_core::name::ProjectionName;
///
/// let a = ProjectionName::new("OrderSummary");
/// let b = ProjectionName::new("ordersummary");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "ordersummary");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectionName(String);

impl ProjectionName {
    /// Create a new `ProjectionName`, normalizing to lowercase.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_lowercase())
    }

    /// Get the normalized name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the `ProjectionName` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProjectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectionName {
    type Err = ParseProjectionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseProjectionNameError(
                "Projection name cannot be empty".to_string(),
            ));
        }
        Ok(Self::new(s))
    }
}

impl From<&str> for ProjectionName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProjectionName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for ProjectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the stable contract id of a projection type.
///
/// The contract id is declared once per type and never changes for the
/// lifetime of the stored data; renaming a Rust type must not rename its
/// contract.
///
/// # Examples
///
/// ```
/// use statefold_core::name::{ProjectionContract, ProjectionName};
///
/// struct OrderSummary;
///
/// impl ProjectionContract for OrderSummary {
///     const CONTRACT_ID: &'static str = "order_summary";
/// }
///
/// assert_eq!(OrderSummary::projection_name(), ProjectionName::new("order_summary"));
/// ```
pub trait ProjectionContract {
    /// The stable string identifier for this projection type.
    const CONTRACT_ID: &'static str;

    /// The contract id as a normalized [`ProjectionName`].
    #[must_use]
    fn projection_name() -> ProjectionName {
        ProjectionName::new(Self::CONTRACT_ID)
    }
}

/// Isolation scope for the version manager.
///
/// Tenants may live at different projection versions; the version-manager
/// projection id is derived from `(projection_name, tenant)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant(String);

impl Tenant {
    /// Create a new tenant identifier.
    #[must_use]
    pub fn new(tenant: impl Into<String>) -> Self {
        Self(tenant.into())
    }

    /// Get the tenant as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Tenant {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Tenant {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_equality_is_case_insensitive() {
        let upper = ProjectionName::new("OrderSummary");
        let lower = ProjectionName::new("ordersummary");
        let other = ProjectionName::new("order_history");

        assert_eq!(upper, lower);
        assert_ne!(upper, other);
    }

    #[test]
    fn name_hashes_equal_for_equal_names() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ProjectionName::new("OrderSummary"));
        assert!(set.contains(&ProjectionName::new("ORDERSUMMARY")));
    }

    #[test]
    fn parse_empty_name_fails() {
        assert!("".parse::<ProjectionName>().is_err());
        assert!("   ".parse::<ProjectionName>().is_err());
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if parse fails
    fn parse_normalizes() {
        let name: ProjectionName = "OrderSummary".parse().expect("parse should succeed");
        assert_eq!(name.as_str(), "ordersummary");
    }

    #[test]
    fn contract_id_derivation() {
        struct Demo;
        impl ProjectionContract for Demo {
            const CONTRACT_ID: &'static str = "Demo_Projection";
        }

        assert_eq!(Demo::projection_name().as_str(), "demo_projection");
    }

    #[test]
    fn tenant_default() {
        assert_eq!(Tenant::default().as_str(), "default");
    }
}
