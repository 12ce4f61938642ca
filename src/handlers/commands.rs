//! Command definitions
//!
//! Commands represent intentions to change the system state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Amount;
use crate::ledger::TransactionRecord;

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move `amount` from the authenticated sender to a receiver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    /// Authenticated caller
    pub sender_id: i64,
    /// Account credited with `amount`
    pub receiver_id: i64,
    /// Validated amount, excluding commission
    pub amount: Amount,
}

impl TransferCommand {
    pub fn new(sender_id: i64, receiver_id: i64, amount: Amount) -> Self {
        Self {
            sender_id,
            receiver_id,
            amount,
        }
    }
}

/// Result of a successful transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub transaction: TransactionRecord,
    pub receiver_name: String,
    /// Sender balance after the debit
    pub new_balance: Decimal,
    /// True when an idempotency key matched an earlier transfer
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_command() {
        let cmd = TransferCommand::new(1, 2, Amount::new(dec!(100.00)).unwrap());

        assert_eq!(cmd.sender_id, 1);
        assert_eq!(cmd.receiver_id, 2);
        assert_eq!(cmd.amount.value(), dec!(100.00));
    }
}
