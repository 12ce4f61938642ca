//! Ledger rows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account state as read from the `users` table
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub name: String,
    pub balance: Decimal,
}

/// A committed ledger entry. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionRecord {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: Decimal,
    pub commission_fee: Decimal,
    pub completed_at: DateTime<Utc>,
}

/// Values for a transaction about to be appended
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: Decimal,
    pub commission_fee: Decimal,
    pub completed_at: DateTime<Utc>,
}

/// The two locked rows of a transfer
#[derive(Debug, Clone)]
pub struct LockedPair {
    pub sender: AccountRow,
    pub receiver: AccountRow,
}

impl LockedPair {
    /// Split rows returned by the locking query into sender and receiver.
    ///
    /// Returns the id of the first party that is missing.
    pub fn from_rows(
        rows: Vec<AccountRow>,
        sender_id: i64,
        receiver_id: i64,
    ) -> Result<Self, i64> {
        let mut sender = None;
        let mut receiver = None;
        for row in rows {
            if row.id == sender_id {
                sender = Some(row);
            } else if row.id == receiver_id {
                receiver = Some(row);
            }
        }

        let sender = sender.ok_or(sender_id)?;
        let receiver = receiver.ok_or(receiver_id)?;
        Ok(Self { sender, receiver })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(id: i64) -> AccountRow {
        AccountRow {
            id,
            name: format!("user-{}", id),
            balance: dec!(10.00),
        }
    }

    #[test]
    fn test_locked_pair_any_order() {
        // Rows come back ordered by id, which may put the receiver first.
        let pair = LockedPair::from_rows(vec![row(3), row(8)], 8, 3).unwrap();
        assert_eq!(pair.sender.id, 8);
        assert_eq!(pair.receiver.id, 3);
    }

    #[test]
    fn test_locked_pair_missing_receiver() {
        let missing = LockedPair::from_rows(vec![row(1)], 1, 2).unwrap_err();
        assert_eq!(missing, 2);
    }

    #[test]
    fn test_locked_pair_missing_sender() {
        let missing = LockedPair::from_rows(vec![row(2)], 1, 2).unwrap_err();
        assert_eq!(missing, 1);
    }
}
