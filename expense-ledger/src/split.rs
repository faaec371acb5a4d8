//! Expense splitting
//!
//! Turns a raw expense definition into per-participant obligations.
//!
//! # Algorithm
//!
//! 1. Validate: positive totals, known assignees, item amounts summing to
//!    the expense total within epsilon.
//! 2. Shared items divide equally across all participants (largest
//!    remainder, ascending participant id).
//! 3. Assigned items accrue wholly to their assignee.
//! 4. Tax is allocated proportionally to each participant's pre-tax
//!    obligation, again by largest remainder, so tax shares sum exactly to
//!    the tax amount.
//! 5. One share per participant; the creator's own share is born settled.
//!
//! Pure computation: persistence belongs to [`crate::Ledger`] and the
//! Repository Port.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::money::Money;
use crate::types::{Expense, Item, ItemSplit, Share, UserId};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Boundary form of one line item
#[derive(Debug, Clone)]
pub struct ItemDraft {
    /// Display name
    pub name: String,

    /// Item amount (non-negative)
    pub amount: Decimal,

    /// Distribution rule
    pub split: ItemSplit,
}

/// Boundary form of an expense submission
#[derive(Debug, Clone)]
pub struct ExpenseDraft {
    /// Title (non-empty)
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Pre-tax total
    pub total_amount: Decimal,

    /// Tax on top of the total
    pub tax_amount: Decimal,

    /// Acting user; always a participant
    pub created_by: UserId,

    /// Other participants; the creator is added when omitted, duplicates
    /// collapse
    pub participants: Vec<UserId>,

    /// Line items (non-empty in any valid submission, since item amounts
    /// must sum to a positive total)
    pub items: Vec<ItemDraft>,
}

/// Result of splitting: the expense record plus one share per participant
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// The validated expense with its items
    pub expense: Expense,

    /// Per-participant obligations, ascending participant id
    pub shares: Vec<Share>,
}

/// Expense splitter
pub struct Splitter {
    config: Config,
}

impl Splitter {
    /// Create a splitter with the given tolerances
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Split an expense definition into per-participant shares
    ///
    /// Validates first, in a fixed order, and only then allocates; no
    /// partial result escapes a failed validation. The emitted shares
    /// always sum exactly to `total_amount + tax_amount`.
    pub fn split(&self, draft: ExpenseDraft) -> Result<SplitOutcome> {
        if draft.title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }

        let total = Money::try_from_decimal(draft.total_amount)?.require_positive("total_amount")?;
        let tax = Money::try_from_decimal(draft.tax_amount)?.require_non_negative("tax_amount")?;

        let mut item_amounts = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            let amount =
                Money::try_from_decimal(item.amount)?.require_non_negative("item amount")?;
            item_amounts.push(amount);
        }

        let mut participants: BTreeSet<UserId> = draft.participants.iter().cloned().collect();
        participants.insert(draft.created_by.clone());

        for item in &draft.items {
            if let Some(user) = item.split.assigned_to() {
                if !participants.contains(user) {
                    return Err(Error::UnknownParticipant { user: user.clone() });
                }
            }
        }

        let items_total: Money = item_amounts.iter().copied().sum();
        let difference = items_total - total;
        if !difference.is_zero_within(self.config.epsilon()) {
            return Err(Error::ItemTotalMismatch { difference });
        }

        // Ascending participant id, the stable order every allocation uses
        let ordered: Vec<&UserId> = participants.iter().collect();
        let index_of: HashMap<&UserId, usize> = ordered
            .iter()
            .enumerate()
            .map(|(idx, user)| (*user, idx))
            .collect();

        let mut pre_tax = vec![Money::ZERO; ordered.len()];
        for (item, &amount) in draft.items.iter().zip(&item_amounts) {
            match &item.split {
                ItemSplit::Shared => {
                    for (idx, part) in amount.split_even(ordered.len()).into_iter().enumerate() {
                        pre_tax[idx] += part;
                    }
                }
                ItemSplit::Assigned(user) => {
                    pre_tax[index_of[user]] += amount;
                }
            }
        }

        let tax_shares = tax.allocate(&pre_tax);

        let expense_id = Uuid::now_v7();
        let created_at = Utc::now();

        let items: Vec<Item> = draft
            .items
            .into_iter()
            .zip(item_amounts)
            .map(|(item, amount)| Item {
                id: Uuid::now_v7(),
                name: item.name,
                amount,
                split: item.split,
            })
            .collect();

        let shares: Vec<Share> = ordered
            .iter()
            .enumerate()
            .map(|(idx, participant)| {
                let amount = pre_tax[idx] + tax_shares[idx];
                let paid_by = **participant == draft.created_by;
                Share {
                    id: Uuid::now_v7(),
                    expense_id,
                    participant: (*participant).clone(),
                    creditor: draft.created_by.clone(),
                    amount,
                    // The creator fronted the expense; their own share has
                    // nothing outstanding.
                    covered: if paid_by { amount } else { Money::ZERO },
                    paid_by,
                    settled: paid_by,
                    created_at,
                }
            })
            .collect();

        // Shares sum exactly to items_total + tax; items_total itself may
        // sit an epsilon away from the declared total
        debug_assert!(shares
            .iter()
            .map(|s| s.amount)
            .sum::<Money>()
            .approx_eq(total + tax, self.config.epsilon()));

        let expense = Expense {
            id: expense_id,
            title: draft.title,
            description: draft.description,
            total_amount: total,
            tax_amount: tax,
            created_by: draft.created_by,
            participants,
            items,
            created_at,
        };

        tracing::info!(
            expense_id = %expense.id,
            participants = expense.participants.len(),
            total = %total,
            tax = %tax,
            "Expense split"
        );

        Ok(SplitOutcome { expense, shares })
    }
}
