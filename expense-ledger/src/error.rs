//! Error types for the expense ledger

use crate::money::Money;
use crate::storage::StorageError;
use crate::types::UserId;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Validation variants are raised before any persistence call; a rejected
/// operation never leaves partial state behind.
#[derive(Error, Debug)]
pub enum Error {
    /// Non-positive or malformed money value
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Expense submitted without a title
    #[error("Expense title must not be empty")]
    EmptyTitle,

    /// An item references a user outside the participant set
    #[error("Unknown participant: {user}")]
    UnknownParticipant {
        /// The referenced non-participant
        user: UserId,
    },

    /// Item amounts do not add up to the expense total
    #[error("Item total differs from expense total by {difference}")]
    ItemTotalMismatch {
        /// Signed delta: items total minus expense total
        difference: Money,
    },

    /// Repository Port failure
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
