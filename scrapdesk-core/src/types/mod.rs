//! `NewType` wrappers for dashboard primitives.
//!
//! This module provides type-safe wrappers around raw values so that
//! monetary amounts, timestamps, and record identifiers cannot be mixed
//! up at compile time.
//!
//! # Types
//!
//! - [`Amount`] - Non-negative monetary amounts
//! - [`Timestamp`] - Unix millisecond timestamps
//! - [`TransactionId`] - Stable identifiers of transaction records

mod amount;
mod timestamp;
mod transaction_id;

pub use amount::Amount;
pub use timestamp::Timestamp;
pub use transaction_id::TransactionId;

/// Validation error for `NewType` construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Amount value is negative
    #[error("amount cannot be negative: {0}")]
    NegativeAmount(rust_decimal::Decimal),

    /// Timestamp is invalid (negative)
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Transaction ID is empty
    #[error("transaction ID cannot be empty")]
    EmptyTransactionId,
}
