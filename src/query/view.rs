//! Read models returned by the query service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Which side of a transaction the viewer is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
}

/// Ledger row joined with both parties' names
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: Decimal,
    pub commission_fee: Decimal,
    pub completed_at: DateTime<Utc>,
    pub sender_name: String,
    pub receiver_name: String,
}

/// A transaction as seen by one of its parties. Computed per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    pub id: i64,
    pub direction: Direction,
    pub counterparty_id: i64,
    pub counterparty_name: String,
    pub amount: Decimal,
    pub commission_fee: Decimal,
    pub completed_at: DateTime<Utc>,
}

impl TransactionView {
    /// Annotate a row from `viewer_id`'s point of view
    pub fn for_viewer(row: TransactionRow, viewer_id: i64) -> Self {
        let (direction, counterparty_id, counterparty_name) = if row.sender_id == viewer_id {
            (Direction::Sent, row.receiver_id, row.receiver_name)
        } else {
            (Direction::Received, row.sender_id, row.sender_name)
        };

        Self {
            id: row.id,
            direction,
            counterparty_id,
            counterparty_name,
            amount: row.amount,
            commission_fee: row.commission_fee,
            completed_at: row.completed_at,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, current_page: u32, per_page: u32, total: i64) -> Self {
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page: last_page(total, per_page),
        }
    }
}

/// Number of pages needed for `total` rows; an empty listing still has page 1
pub fn last_page(total: i64, per_page: u32) -> u32 {
    let per_page = i64::from(per_page.max(1));
    let pages = (total.max(0) + per_page - 1) / per_page;
    u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
}
