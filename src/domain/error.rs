//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

use super::amount::AmountError;

/// Domain-specific errors
///
/// These errors represent business rule violations and input the caller
/// must correct. They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Sender cannot cover amount plus commission
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    /// Invalid amount (too small, too precise, or above the limit)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender or receiver account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    /// Transfer to same account
    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,
}

impl DomainError {
    /// Create an insufficient balance error
    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}
