//! Payment-to-share allocation
//!
//! Plans how one payment is applied against the payer's outstanding
//! shares. The order is fixed: oldest expense first, then lowest share id.
//! Given the same share set and payment, the plan is always identical, so
//! settlement state is reproducible from the payment log alone.
//!
//! Planning is pure; applying the plan through the Repository Port is the
//! processor's job.

use expense_ledger::{Money, Share};
use uuid::Uuid;

/// Planned settlement update for one share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareCoverage {
    /// Target share
    pub share_id: Uuid,

    /// Portion of this payment absorbed by the share
    pub applied: Money,

    /// New cumulative covered amount
    pub covered: Money,

    /// Whether cumulative coverage now reaches the full share amount
    pub settled: bool,
}

/// Complete plan for applying one payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Per-share updates, in application order
    pub coverages: Vec<ShareCoverage>,

    /// Payment remainder no open share could absorb
    ///
    /// Non-zero only when reverse-direction shares netted the pairwise
    /// balance below the payer's gross obligations; the balance math
    /// credits it regardless.
    pub unapplied: Money,
}

/// Plan the application of `amount` against the payer's open shares
///
/// Shares that are already settled, or that are the creditor's own
/// `paid_by` share, never absorb credit. Each remaining share absorbs up
/// to its uncovered portion; a share settles only once cumulative
/// coverage reaches its full amount.
pub fn plan_allocation(amount: Money, shares: &[Share]) -> AllocationPlan {
    let mut open: Vec<&Share> = shares.iter().filter(|s| s.is_open()).collect();
    open.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut remaining = amount;
    let mut coverages = Vec::new();

    for share in open {
        if !remaining.is_positive() {
            break;
        }

        let room = share.outstanding();
        if !room.is_positive() {
            continue;
        }

        let applied = room.min(remaining);
        let covered = share.covered + applied;

        coverages.push(ShareCoverage {
            share_id: share.id,
            applied,
            covered,
            settled: covered >= share.amount,
        });

        remaining -= applied;
    }

    AllocationPlan {
        coverages,
        unapplied: remaining,
    }
}
