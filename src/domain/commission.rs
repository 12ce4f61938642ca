//! Commission policy
//!
//! The fee a sender pays on top of a transfer, as a fixed process-wide rate.

use rust_decimal::{Decimal, RoundingStrategy};

use super::amount::{Amount, MONEY_SCALE};

/// Compute the commission for `amount` at `rate`.
///
/// The product is held to the currency's minor-unit precision, rounding
/// half away from zero the same way a `NUMERIC(_, 2)` column stores it.
/// The stored fee and the debited fee are therefore always the same value.
///
/// ```
/// use rust_decimal::Decimal;
/// use wallet_ledger::domain::compute_commission;
///
/// let fee = compute_commission(Decimal::new(10000, 2), Decimal::new(15, 3));
/// assert_eq!(fee, Decimal::new(150, 2));
/// ```
pub fn compute_commission(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate).round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommissionError {
    #[error("Commission rate must be within [0, 1) (got {0})")]
    RateOutOfRange(Decimal),
}

/// Commission rate bound to a transfer engine at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionPolicy {
    rate: Decimal,
}

impl CommissionPolicy {
    /// 1.5%
    pub const DEFAULT_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 3);

    pub fn new(rate: Decimal) -> Result<Self, CommissionError> {
        if rate < Decimal::ZERO || rate >= Decimal::ONE {
            return Err(CommissionError::RateOutOfRange(rate));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Fee charged for transferring `amount`
    pub fn commission_for(&self, amount: &Amount) -> Decimal {
        compute_commission(amount.value(), self.rate)
    }
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            rate: Self::DEFAULT_RATE,
        }
    }
}
