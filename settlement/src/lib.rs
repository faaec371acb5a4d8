//! Settlement Processor
//!
//! Applies payments against outstanding expense shares.
//!
//! # Flow
//!
//! 1. **Validation**: positive amount, a genuinely outstanding balance,
//!    no overpayment
//! 2. **Recording**: the payment is persisted through the Repository Port
//! 3. **Allocation**: the amount is applied to open shares, oldest
//!    expense first, then lowest share id
//! 4. **Coverage**: each touched share's cumulative coverage advances; a
//!    share settles only once fully covered
//!
//! The whole cycle runs under the ledger's per-pair mutex, so two
//! concurrent partial payments between the same users cannot jointly
//! exceed the outstanding balance.
//!
//! # Example
//!
//! ```
//! use expense_ledger::{Ledger, MemoryRepository, UserId};
//! use rust_decimal::Decimal;
//! use settlement::SettlementProcessor;
//! use std::sync::Arc;
//!
//! let ledger = Arc::new(Ledger::new(Arc::new(MemoryRepository::new())));
//! let processor = SettlementProcessor::new(ledger);
//!
//! // Fails: nothing is owed yet
//! let result = processor.settle(
//!     &UserId::new("ana"),
//!     &UserId::new("ben"),
//!     Decimal::new(1000, 2),
//!     "lunch",
//! );
//! assert!(result.is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod allocation;
pub mod error;
pub mod processor;

// Re-exports
pub use allocation::{plan_allocation, AllocationPlan, ShareCoverage};
pub use error::{Error, Result};
pub use processor::SettlementProcessor;
