//! Error types for the settlement processor

use expense_ledger::{Money, StorageError, UserId};
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
///
/// Preconditions are checked after the ledger read but before the payment
/// write, so a rejected settlement leaves no partial state.
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] expense_ledger::Error),

    /// Payment exceeds the outstanding balance
    #[error("Payment exceeds outstanding balance of {outstanding}")]
    ExcessPayment {
        /// What the payer actually still owes
        outstanding: Money,
    },

    /// The payer owes the recipient nothing
    #[error("No outstanding balance from {from} to {to}")]
    NoOutstandingBalance {
        /// Payer
        from: UserId,
        /// Recipient
        to: UserId,
    },
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Ledger(err.into())
    }
}
