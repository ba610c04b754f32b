//! Property tests for fold determinism and marker arithmetic.
//!
//! The in-memory stores complete their futures without suspending, so the
//! async repository can be driven on an in-place executor inside proptest
//! closures.

#![allow(clippy::unwrap_used)] // Tests fail loudly on unexpected errors

use chrono::Utc;
use proptest::prelude::*;
use statefold_core::hash::{SchemaHasher, Xxh3SchemaHasher};
use statefold_core::id::ProjectionId;
use statefold_core::name::{ProjectionContract, Tenant};
use statefold_core::origin::EventOrigin;
use statefold_core::projection::Projection;
use statefold_core::store::ProjectionCommitStore;
use statefold_core::version::{ProjectionStatus, ProjectionVersion};
use statefold_projections::{
    EventCountStrategy, ProjectionRegistry, ProjectionRepository, VersionLifecycle,
    VersionLifecycleEvent,
};
use statefold_testing::{
    AccountBalance, AccountEvent, InMemoryCommitStore, InMemorySnapshotStore, test_clock,
};
use std::sync::Arc;

fn build_repository(
    page_size: usize,
) -> (Arc<InMemoryCommitStore>, ProjectionRepository, ProjectionVersion) {
    let commits = Arc::new(InMemoryCommitStore::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let registry = Arc::new(
        ProjectionRegistry::new(Arc::new(Xxh3SchemaHasher))
            .register::<AccountBalance>()
            .register::<VersionLifecycle>(),
    );
    let repository = ProjectionRepository::new(
        Arc::clone(&commits) as Arc<dyn ProjectionCommitStore>,
        snapshots,
        registry,
    )
    .with_strategy(Arc::new(EventCountStrategy::new(page_size)))
    .with_clock(Arc::new(test_clock()));

    let live = ProjectionVersion::new(
        AccountBalance::projection_name(),
        ProjectionStatus::Live,
        1,
        Xxh3SchemaHasher.hash(&AccountBalance::descriptor()),
    );
    futures::executor::block_on(repository.save::<VersionLifecycle>(
        &VersionLifecycleEvent::WentLive {
            tenant: Tenant::default(),
            version: live.clone(),
        },
        EventOrigin::new("version-agg".to_string(), 1, 0, Utc::now()),
    ))
    .unwrap();

    (commits, repository, live)
}

fn deposit(amount_cents: u64) -> AccountEvent {
    AccountEvent::Deposited {
        account_id: "acct-p".to_string(),
        amount_cents,
    }
}

fn origin(position: u64) -> EventOrigin {
    EventOrigin::new("account-agg".to_string(), 1, position, Utc::now())
}

proptest! {
    // Reconstruction equals the direct fold of the event sequence,
    // independent of the page size, and repeated reads (which may have
    // checkpointed snapshots in between) agree.
    #[test]
    fn fold_is_deterministic_across_page_sizes(
        amounts in prop::collection::vec(1_u64..1_000, 1..60),
        page_size in 1_usize..8,
    ) {
        let (_commits, repository, _live) = build_repository(page_size);
        let id = ProjectionId::from("acct-p");

        for (position, amount) in amounts.iter().enumerate() {
            futures::executor::block_on(
                repository.save::<AccountBalance>(&deposit(*amount), origin(position as u64)),
            )
            .unwrap();
        }

        let first: AccountBalance =
            futures::executor::block_on(repository.get(&id)).unwrap();
        let second: AccountBalance =
            futures::executor::block_on(repository.get(&id)).unwrap();

        let mut expected = AccountBalance::default();
        for amount in &amounts {
            expected.apply(&deposit(*amount));
        }

        prop_assert_eq!(&first, &expected);
        prop_assert_eq!(&second, &expected);
    }

    // Recorded markers depend only on a commit's ordinal position: they are
    // non-decreasing, advance every page-size commits, and a read that
    // checkpoints snapshots partway through changes nothing.
    #[test]
    fn markers_are_a_function_of_position(
        total in 1_usize..40,
        read_at in 0_usize..40,
        page_size in 1_usize..6,
    ) {
        let (commits, repository, live) = build_repository(page_size);
        let id = ProjectionId::from("acct-p");

        for position in 0..total {
            if position == read_at {
                // May write snapshots; must not disturb marker assignment.
                let _: AccountBalance =
                    futures::executor::block_on(repository.get(&id)).unwrap();
            }
            futures::executor::block_on(
                repository.save::<AccountBalance>(&deposit(1), origin(position as u64)),
            )
            .unwrap();
        }

        let markers: Vec<u64> = commits
            .appended_for(&live, &id)
            .iter()
            .map(statefold_core::ProjectionCommit::snapshot_marker)
            .collect();

        let expected: Vec<u64> = (0..total)
            .map(|position| 1 + (position / page_size) as u64)
            .collect();
        prop_assert_eq!(markers, expected);
    }
}
