//! FairSplit Expense Ledger
//!
//! Splitting engine and balance ledger for shared expenses: turns a raw
//! expense (total, tax, line items, participants) into per-participant
//! obligations, aggregates obligations and payments into pairwise and
//! overall balances, and exposes the persistence port settlements flow
//! through.
//!
//! # Architecture
//!
//! - **Exact money**: integer minor units internally, decimals at the
//!   boundary; largest-remainder allocation never drops or invents a cent
//! - **Derived balances**: pairwise balances are recomputed from the
//!   share/payment log, never stored
//! - **Injected persistence**: the core only sees the [`Repository`] port
//! - **Synchronous core**: every operation runs to completion; pair-level
//!   mutexes serialize settlement read-modify-write cycles
//!
//! # Invariants
//!
//! - Per expense: Σ(share amounts) == total + tax, exactly
//! - Per pair: balance(A, B) == -balance(B, A)
//! - Validation precedes persistence: rejected operations write nothing

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod money;
pub mod split;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use money::Money;
pub use split::{ExpenseDraft, ItemDraft, SplitOutcome, Splitter};
pub use storage::{MemoryRepository, Repository, StorageError, StorageResult};
pub use types::{
    Expense, FriendBalance, Item, ItemSplit, OverallBalance, Payment, Share, UserId,
};
