//! Fixture projections shared across the test suites.
//!
//! `AccountBalance` is the canonical snapshottable read model: single-id and
//! multi-id routing, an event that routes nowhere, arithmetic state that
//! makes fold mistakes visible. `AccountAuditTrail` folds the same events
//! without snapshotting, exercising the full-replay path.

use serde::{Deserialize, Serialize};
use statefold_core::event::DomainEvent;
use statefold_core::id::ProjectionId;
use statefold_core::name::ProjectionContract;
use statefold_core::projection::Projection;

/// Events of the fixture account domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    /// Money deposited to one account.
    Deposited {
        /// The receiving account.
        account_id: String,
        /// Amount in cents.
        amount_cents: u64,
    },
    /// Money withdrawn from one account.
    Withdrawn {
        /// The debited account.
        account_id: String,
        /// Amount in cents.
        amount_cents: u64,
    },
    /// A fee charged to several accounts at once (multi-id routing).
    FeeCharged {
        /// Every charged account.
        account_ids: Vec<String>,
        /// Amount in cents, per account.
        amount_cents: u64,
    },
    /// End-of-day marker; routes to no account.
    DayClosed,
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Deposited { .. } => "AccountDeposited.v1",
            Self::Withdrawn { .. } => "AccountWithdrawn.v1",
            Self::FeeCharged { .. } => "AccountFeeCharged.v1",
            Self::DayClosed => "AccountDayClosed.v1",
        }
    }
}

fn route(event: &AccountEvent) -> Vec<ProjectionId> {
    match event {
        AccountEvent::Deposited { account_id, .. }
        | AccountEvent::Withdrawn { account_id, .. } => {
            vec![ProjectionId::from(account_id.as_str())]
        },
        AccountEvent::FeeCharged { account_ids, .. } => account_ids
            .iter()
            .map(|id| ProjectionId::from(id.as_str()))
            .collect(),
        AccountEvent::DayClosed => Vec::new(),
    }
}

/// Snapshottable fixture: running balance of one account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Current balance in cents (may go negative).
    pub balance_cents: i64,
    /// Number of folded transactions.
    pub transactions: u64,
}

impl ProjectionContract for AccountBalance {
    const CONTRACT_ID: &'static str = "account_balance";
}

impl Projection for AccountBalance {
    type Event = AccountEvent;

    fn projection_ids(event: &AccountEvent) -> Vec<ProjectionId> {
        route(event)
    }

    #[allow(clippy::cast_possible_wrap)] // Amounts are far below i64::MAX
    fn apply(&mut self, event: &AccountEvent) {
        match event {
            AccountEvent::Deposited { amount_cents, .. } => {
                self.balance_cents += *amount_cents as i64;
                self.transactions += 1;
            },
            AccountEvent::Withdrawn { amount_cents, .. }
            | AccountEvent::FeeCharged { amount_cents, .. } => {
                self.balance_cents -= *amount_cents as i64;
                self.transactions += 1;
            },
            AccountEvent::DayClosed => {},
        }
    }

    fn state_shape() -> &'static str {
        "balance_cents:i64,transactions:u64"
    }

    fn handled_events() -> &'static [&'static str] {
        &[
            "AccountDeposited.v1",
            "AccountWithdrawn.v1",
            "AccountFeeCharged.v1",
            "AccountDayClosed.v1",
        ]
    }
}

/// Non-snapshottable fixture: flat audit trail of everything that touched
/// one account. Replays its full history on every read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAuditTrail {
    /// One line per folded event.
    pub entries: Vec<String>,
}

impl ProjectionContract for AccountAuditTrail {
    const CONTRACT_ID: &'static str = "account_audit_trail";
}

impl Projection for AccountAuditTrail {
    type Event = AccountEvent;

    fn projection_ids(event: &AccountEvent) -> Vec<ProjectionId> {
        route(event)
    }

    fn apply(&mut self, event: &AccountEvent) {
        let line = match event {
            AccountEvent::Deposited { amount_cents, .. } => format!("deposit {amount_cents}"),
            AccountEvent::Withdrawn { amount_cents, .. } => format!("withdraw {amount_cents}"),
            AccountEvent::FeeCharged { amount_cents, .. } => format!("fee {amount_cents}"),
            AccountEvent::DayClosed => "day closed".to_string(),
        };
        self.entries.push(line);
    }

    fn snapshottable() -> bool {
        false
    }

    fn state_shape() -> &'static str {
        "entries:Vec<String>"
    }

    fn handled_events() -> &'static [&'static str] {
        &[
            "AccountDeposited.v1",
            "AccountWithdrawn.v1",
            "AccountFeeCharged.v1",
            "AccountDayClosed.v1",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_covers_zero_one_and_many() {
        assert!(AccountBalance::projection_ids(&AccountEvent::DayClosed).is_empty());
        assert_eq!(
            AccountBalance::projection_ids(&AccountEvent::Deposited {
                account_id: "a".to_string(),
                amount_cents: 1,
            })
            .len(),
            1,
        );
        assert_eq!(
            AccountBalance::projection_ids(&AccountEvent::FeeCharged {
                account_ids: vec!["a".to_string(), "b".to_string()],
                amount_cents: 1,
            })
            .len(),
            2,
        );
    }

    #[test]
    fn balance_fold_arithmetic() {
        let mut balance = AccountBalance::default();
        balance.apply(&AccountEvent::Deposited {
            account_id: "a".to_string(),
            amount_cents: 500,
        });
        balance.apply(&AccountEvent::Withdrawn {
            account_id: "a".to_string(),
            amount_cents: 200,
        });
        balance.apply(&AccountEvent::DayClosed);

        assert_eq!(balance.balance_cents, 300);
        assert_eq!(balance.transactions, 2);
    }

    #[test]
    fn audit_trail_is_not_snapshottable() {
        assert!(!AccountAuditTrail::snapshottable());
        assert!(AccountBalance::snapshottable());
    }
}
