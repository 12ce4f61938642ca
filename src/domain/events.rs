//! Domain Events
//!
//! Facts published after a transfer has committed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A transfer was committed to the ledger.
///
/// Published once per committed transaction, after the atomic scope ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCompleted {
    pub transaction_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: Decimal,
    pub commission_fee: Decimal,
    pub completed_at: DateTime<Utc>,
}

impl TransferCompleted {
    pub fn event_type(&self) -> &'static str {
        "TransferCompleted"
    }
}
