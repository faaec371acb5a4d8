//! Balance ledger
//!
//! Derives pairwise and overall balances from the share and payment
//! history held behind the Repository Port, and records new expenses
//! atomically. Balances are never stored: they are recomputed from
//! strictly the queried pair's transactions, so the share/payment log
//! stays the single source of truth.
//!
//! # Sign convention
//!
//! `balance(a, b)` is positive when `a` owes `b`, and
//! `balance(a, b) == -balance(b, a)` always.

use crate::config::Config;
use crate::error::Result;
use crate::money::Money;
use crate::split::{ExpenseDraft, SplitOutcome, Splitter};
use crate::storage::Repository;
use crate::types::{FriendBalance, OverallBalance, UserId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Unordered user pair, the locking granularity for settlements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey(UserId, UserId);

impl PairKey {
    fn new(a: &UserId, b: &UserId) -> Self {
        if a <= b {
            Self(a.clone(), b.clone())
        } else {
            Self(b.clone(), a.clone())
        }
    }
}

/// Main ledger interface
pub struct Ledger {
    /// Injected persistence port
    repository: Arc<dyn Repository>,

    /// Expense splitter sharing the engine tolerances
    splitter: Splitter,

    /// One mutex per unordered user pair; serializes settlement
    /// read-modify-write cycles
    pair_locks: DashMap<PairKey, Arc<Mutex<()>>>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Create a ledger over the given repository with default tolerances
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self::with_config(repository, Config::default())
    }

    /// Create a ledger with explicit configuration
    pub fn with_config(repository: Arc<dyn Repository>, config: Config) -> Self {
        tracing::info!(service = %config.service_name, "Ledger initialized");

        Self {
            repository,
            splitter: Splitter::new(config.clone()),
            pair_locks: DashMap::new(),
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying repository handle
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    /// Split an expense and persist it with its shares as one atomic unit
    ///
    /// Validation happens entirely before the storage call; a rejected
    /// draft writes nothing.
    pub fn record_expense(&self, draft: ExpenseDraft) -> Result<SplitOutcome> {
        let outcome = self.splitter.split(draft)?;
        self.repository
            .save_expense(&outcome.expense, &outcome.shares)?;

        tracing::info!(
            expense_id = %outcome.expense.id,
            created_by = %outcome.expense.created_by,
            "Expense recorded"
        );

        Ok(outcome)
    }

    /// Net signed balance between two users; positive means `a` owes `b`
    ///
    /// Computed from exactly this pair's shares and payments: shares where
    /// `a` owes `b`, minus the reverse, minus payments `a` already made to
    /// `b`, plus payments received. A pair with no history balances to
    /// zero; this is not an error.
    pub fn balance(&self, a: &UserId, b: &UserId) -> Result<Money> {
        if a == b {
            return Ok(Money::ZERO);
        }

        let shares = self.repository.load_shares_for_pair(a, b)?;
        let payments = self.repository.load_payments_for_pair(a, b)?;

        let mut balance = Money::ZERO;

        for share in shares.iter().filter(|s| !s.paid_by) {
            if &share.participant == a && &share.creditor == b {
                balance += share.amount;
            } else if &share.participant == b && &share.creditor == a {
                balance -= share.amount;
            }
        }

        for payment in &payments {
            if &payment.from_user == a {
                balance -= payment.amount;
            } else {
                balance += payment.amount;
            }
        }

        Ok(balance)
    }

    /// Aggregate position of one user across every counterparty
    ///
    /// Friends whose pairwise balance is zero within epsilon appear in
    /// neither list.
    pub fn overall_balance(&self, user: &UserId) -> Result<OverallBalance> {
        let epsilon = self.config.epsilon();

        let mut total_due_to_user = Money::ZERO;
        let mut total_user_owes = Money::ZERO;
        let mut friends_owing_user = Vec::new();
        let mut user_owing_friends = Vec::new();

        for friend in self.repository.counterparties(user)? {
            let balance = self.balance(user, &friend)?;

            if balance.is_zero_within(epsilon) {
                continue;
            }

            if balance.is_positive() {
                total_user_owes += balance;
                user_owing_friends.push(FriendBalance {
                    friend,
                    amount: balance,
                });
            } else {
                total_due_to_user += balance.abs();
                friends_owing_user.push(FriendBalance {
                    friend,
                    amount: balance.abs(),
                });
            }
        }

        Ok(OverallBalance {
            total_balance: total_due_to_user - total_user_owes,
            total_due_to_user,
            total_user_owes,
            friends_owing_user,
            user_owing_friends,
        })
    }

    /// Mutex guarding settlements for the unordered pair `(a, b)`
    ///
    /// Both directions map to the same lock, so two concurrent partial
    /// payments between the same two users cannot jointly exceed the
    /// outstanding balance.
    pub fn pair_lock(&self, a: &UserId, b: &UserId) -> Arc<Mutex<()>> {
        self.pair_locks
            .entry(PairKey::new(a, b))
            .or_default()
            .clone()
    }
}
