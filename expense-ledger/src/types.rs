//! Core domain types for the expense ledger
//!
//! All types are designed for:
//! - Strong typing at the boundary (no loosely-typed payloads)
//! - Serde serialization matching the shapes consumers read
//! - Exact arithmetic (integer minor units for money)
//!
//! Record ids are UUIDv7 so id order follows creation order, which the
//! settlement allocator relies on for deterministic tie-breaking.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// User identifier
///
/// Opaque handle owned by the external auth subsystem; the ledger never
/// inspects it beyond equality and ordering. Ordering matters: every
/// allocation walks participants in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an item's amount is distributed among participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemSplit {
    /// Divided equally among all expense participants
    Shared,
    /// Accrues wholly to one participant
    Assigned(UserId),
}

impl ItemSplit {
    /// True for equally-divided items
    pub fn is_shared(&self) -> bool {
        matches!(self, ItemSplit::Shared)
    }

    /// The assignee, for assigned items
    pub fn assigned_to(&self) -> Option<&UserId> {
        match self {
            ItemSplit::Shared => None,
            ItemSplit::Assigned(user) => Some(user),
        }
    }
}

/// One line item of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Item amount (non-negative)
    pub amount: Money,

    /// Distribution rule
    pub split: ItemSplit,
}

/// A recorded expense with its line items
///
/// Immutable after creation; settlement state lives on the shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique expense ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Title (non-empty)
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Pre-tax total; item amounts sum to this
    pub total_amount: Money,

    /// Tax on top of the total
    pub tax_amount: Money,

    /// The participant who fronted the expense
    pub created_by: UserId,

    /// Everyone the expense is split across, creator included
    pub participants: BTreeSet<UserId>,

    /// Line items, in submission order
    pub items: Vec<Item>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One participant's obligation for one expense
///
/// Created atomically with the expense. `amount` is derived by the
/// splitter and never changes; settlements only advance `covered` and flip
/// `settled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Unique share ID (UUIDv7)
    pub id: Uuid,

    /// Owning expense
    pub expense_id: Uuid,

    /// Who owes this share
    pub participant: UserId,

    /// Who is owed (the expense creator)
    pub creditor: UserId,

    /// Full obligation: item contributions plus allocated tax
    pub amount: Money,

    /// Cumulative amount applied by settlements
    #[serde(default)]
    pub covered: Money,

    /// True only on the creator's own share
    pub paid_by: bool,

    /// True once `covered` reaches `amount`
    pub settled: bool,

    /// Inherited from the owning expense; settlement allocation orders by
    /// (created_at, id)
    pub created_at: DateTime<Utc>,
}

impl Share {
    /// Portion not yet covered by settlements
    pub fn outstanding(&self) -> Money {
        self.amount - self.covered
    }

    /// True if this share can still absorb settlement credit
    pub fn is_open(&self) -> bool {
        !self.paid_by && !self.settled
    }
}

/// A completed transfer between two users
///
/// Immutable once recorded; applied against one or more shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment ID (UUIDv7)
    pub id: Uuid,

    /// Payer
    pub from_user: UserId,

    /// Recipient
    pub to_user: UserId,

    /// Transferred amount (positive)
    pub amount: Money,

    /// Free-form notes
    pub notes: String,

    /// Recording timestamp
    pub created_at: DateTime<Utc>,
}

/// One friend's net position in an overall-balance view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendBalance {
    /// The counterparty
    pub friend: UserId,

    /// Absolute amount owed in this direction
    pub amount: Money,
}

/// Aggregate balance view for one user across all counterparties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallBalance {
    /// Net position: positive means the user is owed money overall
    pub total_balance: Money,

    /// Sum owed to the user by friends
    pub total_due_to_user: Money,

    /// Sum the user owes to friends
    pub total_user_owes: Money,

    /// Friends with a positive balance toward the user
    pub friends_owing_user: Vec<FriendBalance>,

    /// Friends the user owes
    pub user_owing_friends: Vec<FriendBalance>,
}
