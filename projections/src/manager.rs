//! The version-manager projection - a projection about projections.
//!
//! # Overview
//!
//! Version lifecycle transitions are themselves domain events, folded into a
//! [`VersionLifecycle`] projection whose state is the current
//! [`ProjectionVersions`] set for one `(projection name, tenant)` pair. The
//! version resolver replays this projection through the same stream loader
//! that serves user projections, which is what bootstraps the whole system:
//! versions are read the way any read model is read.
//!
//! The version-manager projection cannot resolve its own version through the
//! resolver (that would recurse), so it is pinned to a single [`Live`]
//! revision, [`manager_version`].
//!
//! [`Live`]: ProjectionStatus::Live

use serde::{Deserialize, Serialize};
use statefold_core::event::DomainEvent;
use statefold_core::hash::{SchemaHasher, Xxh3SchemaHasher};
use statefold_core::id::ProjectionId;
use statefold_core::name::{ProjectionContract, ProjectionName, Tenant};
use statefold_core::projection::Projection;
use statefold_core::version::{ProjectionStatus, ProjectionVersion, ProjectionVersions};

/// Lifecycle transition of a projection version.
///
/// Each event carries the tenant it applies to and the version it moves; the
/// variant alone determines the resulting status (the status embedded in the
/// carried version is ignored).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionLifecycleEvent {
    /// A new version was requested (→ `New`).
    VersionRequested {
        /// Tenant scope of the transition.
        tenant: Tenant,
        /// The version being requested.
        version: ProjectionVersion,
    },
    /// A rebuild worker started feeding the version (→ `Building`).
    BuildStarted {
        /// Tenant scope of the transition.
        tenant: Tenant,
        /// The version being rebuilt.
        version: ProjectionVersion,
    },
    /// The rebuild caught up and the version now serves reads (→ `Live`).
    WentLive {
        /// Tenant scope of the transition.
        tenant: Tenant,
        /// The version going live.
        version: ProjectionVersion,
    },
    /// The rebuild was canceled (→ `Canceled`).
    BuildCanceled {
        /// Tenant scope of the transition.
        tenant: Tenant,
        /// The version whose rebuild was canceled.
        version: ProjectionVersion,
    },
    /// The rebuild exceeded its timebox (→ `Timedout`).
    BuildTimedOut {
        /// Tenant scope of the transition.
        tenant: Tenant,
        /// The version whose rebuild timed out.
        version: ProjectionVersion,
    },
}

impl VersionLifecycleEvent {
    /// The tenant this transition applies to.
    #[must_use]
    pub const fn tenant(&self) -> &Tenant {
        match self {
            Self::VersionRequested { tenant, .. }
            | Self::BuildStarted { tenant, .. }
            | Self::WentLive { tenant, .. }
            | Self::BuildCanceled { tenant, .. }
            | Self::BuildTimedOut { tenant, .. } => tenant,
        }
    }

    /// The version being transitioned.
    #[must_use]
    pub const fn version(&self) -> &ProjectionVersion {
        match self {
            Self::VersionRequested { version, .. }
            | Self::BuildStarted { version, .. }
            | Self::WentLive { version, .. }
            | Self::BuildCanceled { version, .. }
            | Self::BuildTimedOut { version, .. } => version,
        }
    }

    /// The status this transition moves the version into.
    #[must_use]
    pub const fn target_status(&self) -> ProjectionStatus {
        match self {
            Self::VersionRequested { .. } => ProjectionStatus::New,
            Self::BuildStarted { .. } => ProjectionStatus::Building,
            Self::WentLive { .. } => ProjectionStatus::Live,
            Self::BuildCanceled { .. } => ProjectionStatus::Canceled,
            Self::BuildTimedOut { .. } => ProjectionStatus::Timedout,
        }
    }
}

impl DomainEvent for VersionLifecycleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::VersionRequested { .. } => "VersionRequested.v1",
            Self::BuildStarted { .. } => "VersionBuildStarted.v1",
            Self::WentLive { .. } => "VersionWentLive.v1",
            Self::BuildCanceled { .. } => "VersionBuildCanceled.v1",
            Self::BuildTimedOut { .. } => "VersionBuildTimedOut.v1",
        }
    }
}

/// Derive the version-manager projection id for one `(name, tenant)` pair.
#[must_use]
pub fn version_manager_id(name: &ProjectionName, tenant: &Tenant) -> ProjectionId {
    ProjectionId::new(format!("{name}|{tenant}").into_bytes())
}

/// Read model of one projection name's version set within a tenant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLifecycle {
    versions: Option<ProjectionVersions>,
}

impl VersionLifecycle {
    /// The tracked version set, if any transition has been folded yet.
    #[must_use]
    pub const fn versions(&self) -> Option<&ProjectionVersions> {
        self.versions.as_ref()
    }

    /// Consume the state, yielding the tracked version set.
    #[must_use]
    pub fn into_versions(self) -> Option<ProjectionVersions> {
        self.versions
    }
}

impl ProjectionContract for VersionLifecycle {
    const CONTRACT_ID: &'static str = "statefold.projection_versions";
}

impl Projection for VersionLifecycle {
    type Event = VersionLifecycleEvent;

    fn projection_ids(event: &VersionLifecycleEvent) -> Vec<ProjectionId> {
        vec![version_manager_id(event.version().name(), event.tenant())]
    }

    fn apply(&mut self, event: &VersionLifecycleEvent) {
        let transitioned = event.version().with_status(event.target_status());
        self.versions
            .get_or_insert_with(|| ProjectionVersions::new(transitioned.name().clone()))
            .apply(transitioned);
    }

    fn state_shape() -> &'static str {
        "versions:Option<ProjectionVersions>"
    }

    fn handled_events() -> &'static [&'static str] {
        &[
            "VersionRequested.v1",
            "VersionBuildStarted.v1",
            "VersionWentLive.v1",
            "VersionBuildCanceled.v1",
            "VersionBuildTimedOut.v1",
        ]
    }
}

/// The pinned live version of the version-manager projection itself.
///
/// Revision 1, always live, hash computed from the definition's own
/// descriptor.
#[must_use]
pub fn manager_version() -> ProjectionVersion {
    ProjectionVersion::new(
        VersionLifecycle::projection_name(),
        ProjectionStatus::Live,
        1,
        Xxh3SchemaHasher.hash(&VersionLifecycle::descriptor()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use statefold_core::hash::SchemaHash;

    fn version(revision: u64) -> ProjectionVersion {
        ProjectionVersion::new(
            ProjectionName::new("orders"),
            ProjectionStatus::New,
            revision,
            SchemaHash::new(3),
        )
    }

    fn fold(events: &[VersionLifecycleEvent]) -> VersionLifecycle {
        let mut state = VersionLifecycle::default();
        for event in events {
            state.apply(event);
        }
        state
    }

    #[test]
    fn full_lifecycle_to_live() {
        let tenant = Tenant::default();
        let state = fold(&[
            VersionLifecycleEvent::VersionRequested {
                tenant: tenant.clone(),
                version: version(1),
            },
            VersionLifecycleEvent::BuildStarted {
                tenant: tenant.clone(),
                version: version(1),
            },
            VersionLifecycleEvent::WentLive {
                tenant,
                version: version(1),
            },
        ]);

        #[allow(clippy::unwrap_used)]
        let versions = state.versions().unwrap();
        assert_eq!(
            versions.live().map(ProjectionVersion::revision),
            Some(1),
        );
    }

    #[test]
    fn new_live_retires_previous_live() {
        let tenant = Tenant::default();
        let state = fold(&[
            VersionLifecycleEvent::WentLive {
                tenant: tenant.clone(),
                version: version(1),
            },
            VersionLifecycleEvent::BuildStarted {
                tenant: tenant.clone(),
                version: version(2),
            },
            VersionLifecycleEvent::WentLive {
                tenant,
                version: version(2),
            },
        ]);

        #[allow(clippy::unwrap_used)]
        let versions = state.versions().unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions.live().map(ProjectionVersion::revision), Some(2));
    }

    #[test]
    fn canceled_build_is_not_a_write_target() {
        let tenant = Tenant::default();
        let state = fold(&[
            VersionLifecycleEvent::WentLive {
                tenant: tenant.clone(),
                version: version(1),
            },
            VersionLifecycleEvent::BuildStarted {
                tenant: tenant.clone(),
                version: version(2),
            },
            VersionLifecycleEvent::BuildCanceled {
                tenant,
                version: version(2),
            },
        ]);

        #[allow(clippy::unwrap_used)]
        let versions = state.versions().unwrap();
        assert_eq!(versions.write_targets().len(), 1);
        assert_eq!(
            versions.get(2).map(ProjectionVersion::status),
            Some(ProjectionStatus::Canceled),
        );
    }

    #[test]
    fn routes_to_name_and_tenant_id() {
        let event = VersionLifecycleEvent::WentLive {
            tenant: Tenant::new("acme"),
            version: version(1),
        };
        let ids = VersionLifecycle::projection_ids(&event);
        assert_eq!(ids, vec![ProjectionId::from("orders|acme")]);
    }

    #[test]
    fn manager_version_is_pinned_live() {
        let pinned = manager_version();
        assert_eq!(pinned.status(), ProjectionStatus::Live);
        assert_eq!(pinned.revision(), 1);
        assert_eq!(pinned.name(), &VersionLifecycle::projection_name());
        // Deterministic across calls.
        assert_eq!(pinned.hash(), manager_version().hash());
    }
}
