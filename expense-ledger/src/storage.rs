//! Storage layer: the Repository Port and its in-memory reference
//!
//! The ledger core never touches persistence mechanics directly; it works
//! against the [`Repository`] trait. Implementations own retry and timeout
//! policy for transient failures — the core surfaces [`StorageError`]
//! unretried.
//!
//! # Contract
//!
//! - `save_expense` persists an expense and its full share set as one
//!   atomic unit; a reader must never observe the expense without all of
//!   its shares.
//! - Storage failures are distinct from business-rule failures: every
//!   method returns [`StorageError`], which the core wraps as
//!   `Error::Storage`.

use crate::money::Money;
use crate::types::{Expense, Payment, Share, UserId};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use uuid::Uuid;

/// Result type for repository operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Repository failures, distinct from business-rule errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend unreachable or failed
    #[error("{0}")]
    Unavailable(String),
}

/// Persistence port consumed by the ledger core
pub trait Repository: Send + Sync {
    /// Persist an expense and its full share set atomically
    fn save_expense(&self, expense: &Expense, shares: &[Share]) -> StorageResult<()>;

    /// All shares whose (participant, creditor) is (a, b) or (b, a)
    fn load_shares_for_pair(&self, a: &UserId, b: &UserId) -> StorageResult<Vec<Share>>;

    /// All payments between the pair, in either direction
    fn load_payments_for_pair(&self, a: &UserId, b: &UserId) -> StorageResult<Vec<Payment>>;

    /// Persist a completed payment
    fn save_payment(&self, payment: &Payment) -> StorageResult<()>;

    /// Advance a share's settlement state
    fn update_share_settlement(
        &self,
        share_id: Uuid,
        settled: bool,
        covered: Money,
    ) -> StorageResult<()>;

    /// Every user sharing any expense or payment history with `user`,
    /// ascending
    fn counterparties(&self, user: &UserId) -> StorageResult<Vec<UserId>>;
}

/// In-memory repository
///
/// Reference implementation backing tests and embedders that bring their
/// own durability. A single `RwLock` over the whole state gives
/// `save_expense` its atomicity for free.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    expenses: HashMap<Uuid, Expense>,
    shares: HashMap<Uuid, Share>,
    payments: Vec<Payment>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

fn pair_matches(x: &UserId, y: &UserId, a: &UserId, b: &UserId) -> bool {
    (x == a && y == b) || (x == b && y == a)
}

impl Repository for MemoryRepository {
    fn save_expense(&self, expense: &Expense, shares: &[Share]) -> StorageResult<()> {
        let mut state = self.state.write();

        state.expenses.insert(expense.id, expense.clone());
        for share in shares {
            state.shares.insert(share.id, share.clone());
        }

        tracing::debug!(
            expense_id = %expense.id,
            share_count = shares.len(),
            "Expense saved"
        );

        Ok(())
    }

    fn load_shares_for_pair(&self, a: &UserId, b: &UserId) -> StorageResult<Vec<Share>> {
        let state = self.state.read();

        let mut shares: Vec<Share> = state
            .shares
            .values()
            .filter(|s| pair_matches(&s.participant, &s.creditor, a, b))
            .cloned()
            .collect();

        // HashMap iteration order is arbitrary; return a stable order
        shares.sort_by(|x, y| x.created_at.cmp(&y.created_at).then(x.id.cmp(&y.id)));

        Ok(shares)
    }

    fn load_payments_for_pair(&self, a: &UserId, b: &UserId) -> StorageResult<Vec<Payment>> {
        let state = self.state.read();

        Ok(state
            .payments
            .iter()
            .filter(|p| pair_matches(&p.from_user, &p.to_user, a, b))
            .cloned()
            .collect())
    }

    fn save_payment(&self, payment: &Payment) -> StorageResult<()> {
        let mut state = self.state.write();
        state.payments.push(payment.clone());

        tracing::debug!(
            payment_id = %payment.id,
            from = %payment.from_user,
            to = %payment.to_user,
            "Payment saved"
        );

        Ok(())
    }

    fn update_share_settlement(
        &self,
        share_id: Uuid,
        settled: bool,
        covered: Money,
    ) -> StorageResult<()> {
        let mut state = self.state.write();

        let share = state
            .shares
            .get_mut(&share_id)
            .ok_or_else(|| StorageError::NotFound(format!("share {}", share_id)))?;

        share.settled = settled;
        share.covered = covered;

        tracing::debug!(share_id = %share_id, settled, covered = %covered, "Share settlement updated");

        Ok(())
    }

    fn counterparties(&self, user: &UserId) -> StorageResult<Vec<UserId>> {
        let state = self.state.read();
        let mut friends: BTreeSet<UserId> = BTreeSet::new();

        for share in state.shares.values() {
            if &share.participant == user && &share.creditor != user {
                friends.insert(share.creditor.clone());
            } else if &share.creditor == user && &share.participant != user {
                friends.insert(share.participant.clone());
            }
        }

        for payment in &state.payments {
            if &payment.from_user == user {
                friends.insert(payment.to_user.clone());
            } else if &payment.to_user == user {
                friends.insert(payment.from_user.clone());
            }
        }

        Ok(friends.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_expense(created_by: &str, participants: &[&str]) -> Expense {
        Expense {
            id: Uuid::now_v7(),
            title: "Groceries".to_string(),
            description: String::new(),
            total_amount: Money::from_minor(10000),
            tax_amount: Money::ZERO,
            created_by: UserId::new(created_by),
            participants: participants.iter().map(|p| UserId::new(*p)).collect(),
            items: vec![],
            created_at: Utc::now(),
        }
    }

    fn test_share(expense: &Expense, participant: &str, amount: i64) -> Share {
        Share {
            id: Uuid::now_v7(),
            expense_id: expense.id,
            participant: UserId::new(participant),
            creditor: expense.created_by.clone(),
            amount: Money::from_minor(amount),
            covered: Money::ZERO,
            paid_by: false,
            settled: false,
            created_at: expense.created_at,
        }
    }

    fn test_payment(from: &str, to: &str, amount: i64) -> Payment {
        Payment {
            id: Uuid::now_v7(),
            from_user: UserId::new(from),
            to_user: UserId::new(to),
            amount: Money::from_minor(amount),
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_load_pair_shares() {
        let repo = MemoryRepository::new();
        let expense = test_expense("ben", &["ana", "ben"]);
        let shares = vec![test_share(&expense, "ana", 5000)];

        repo.save_expense(&expense, &shares).unwrap();

        let loaded = repo
            .load_shares_for_pair(&UserId::new("ana"), &UserId::new("ben"))
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].amount, Money::from_minor(5000));

        // Pair order must not matter
        let reversed = repo
            .load_shares_for_pair(&UserId::new("ben"), &UserId::new("ana"))
            .unwrap();
        assert_eq!(reversed, loaded);
    }

    #[test]
    fn test_other_pairs_do_not_leak() {
        let repo = MemoryRepository::new();

        let expense_ab = test_expense("ben", &["ana", "ben"]);
        let expense_cd = test_expense("dan", &["cam", "dan"]);
        repo.save_expense(&expense_ab, &[test_share(&expense_ab, "ana", 5000)])
            .unwrap();
        repo.save_expense(&expense_cd, &[test_share(&expense_cd, "cam", 7000)])
            .unwrap();

        let loaded = repo
            .load_shares_for_pair(&UserId::new("ana"), &UserId::new("ben"))
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].participant, UserId::new("ana"));
    }

    #[test]
    fn test_payments_filtered_by_pair() {
        let repo = MemoryRepository::new();
        repo.save_payment(&test_payment("ana", "ben", 1000)).unwrap();
        repo.save_payment(&test_payment("ben", "ana", 400)).unwrap();
        repo.save_payment(&test_payment("cam", "dan", 9999)).unwrap();

        let loaded = repo
            .load_payments_for_pair(&UserId::new("ana"), &UserId::new("ben"))
            .unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_update_share_settlement() {
        let repo = MemoryRepository::new();
        let expense = test_expense("ben", &["ana", "ben"]);
        let share = test_share(&expense, "ana", 5000);
        let share_id = share.id;
        repo.save_expense(&expense, &[share]).unwrap();

        repo.update_share_settlement(share_id, true, Money::from_minor(5000))
            .unwrap();

        let loaded = repo
            .load_shares_for_pair(&UserId::new("ana"), &UserId::new("ben"))
            .unwrap();
        assert!(loaded[0].settled);
        assert_eq!(loaded[0].covered, Money::from_minor(5000));
    }

    #[test]
    fn test_update_unknown_share_is_not_found() {
        let repo = MemoryRepository::new();
        let result = repo.update_share_settlement(Uuid::now_v7(), true, Money::ZERO);
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_counterparties_sorted_and_deduplicated() {
        let repo = MemoryRepository::new();

        let expense = test_expense("ben", &["ana", "ben"]);
        repo.save_expense(&expense, &[test_share(&expense, "ana", 5000)])
            .unwrap();
        repo.save_payment(&test_payment("ana", "ben", 1000)).unwrap();
        repo.save_payment(&test_payment("cam", "ana", 300)).unwrap();

        let friends = repo.counterparties(&UserId::new("ana")).unwrap();
        assert_eq!(friends, vec![UserId::new("ben"), UserId::new("cam")]);
    }
}
