//! Amount type
//!
//! Domain primitive for transfer amounts with business rule validation.
//! All amounts are validated at construction time, ensuring invalid values
//! cannot exist in the system.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency minor-unit precision (cents)
pub const MONEY_SCALE: u32 = 2;

/// Amount represents a validated transfer value.
///
/// # Invariants
/// - Value is at least 0.01
/// - Maximum 2 decimal places
/// - Maximum value is 999,999,999.99
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use wallet_ledger::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(10000, 2)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(100, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be at least 0.01 (got {0})")]
    TooSmall(Decimal),

    #[error("Amount has too many decimal places (max {MONEY_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({0})")]
    Overflow(Decimal),

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Smallest transferable value
    pub const MIN: Decimal = Decimal::from_parts(1, 0, 0, false, MONEY_SCALE);

    /// Largest transferable value
    pub const MAX: Decimal = Decimal::from_parts(0x4876_E7FF, 0x17, 0, false, MONEY_SCALE);

    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::TooSmall` if value < 0.01
    /// - `AmountError::TooManyDecimals` if more than 2 significant decimal places
    /// - `AmountError::Overflow` if value > 999,999,999.99
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        // "100.000" is fine, "100.001" is not
        let value = value.normalize();

        if value < Self::MIN {
            return Err(AmountError::TooSmall(value));
        }

        if value.scale() > MONEY_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        if value > Self::MAX {
            return Err(AmountError::Overflow(Self::MAX));
        }

        let mut value = value;
        value.rescale(MONEY_SCALE);
        Ok(Self(value))
    }

    /// Get the underlying Decimal value (always scale 2).
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check that this amount does not exceed a configured ceiling.
    pub fn ensure_at_most(self, ceiling: Decimal) -> Result<Self, AmountError> {
        if self.0 > ceiling {
            return Err(AmountError::Overflow(ceiling));
        }
        Ok(self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}
