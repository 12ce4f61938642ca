//! Transfer notices and the mail transport seam

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::TransferCompleted;

/// A party to a transfer as seen by the mailer
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Sent to the sender: money left the account
    Debit,
    /// Sent to the receiver: money arrived
    Credit,
}

/// One outbound message about a committed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub recipient_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub transaction_id: i64,
    pub amount: Decimal,
    /// Only charged to the sender; zero on credit notices
    pub commission_fee: Decimal,
    pub counterparty_name: String,
    pub completed_at: DateTime<Utc>,
}

/// Build the debit notice for the sender and the credit notice for the receiver
pub fn compose_notices(event: &TransferCompleted, sender: &Contact, receiver: &Contact) -> [Notice; 2] {
    let debit = Notice {
        kind: NoticeKind::Debit,
        recipient_name: sender.name.clone(),
        recipient_email: sender.email.clone(),
        subject: format!("You sent {:.2} to {}", event.amount, receiver.name),
        transaction_id: event.transaction_id,
        amount: event.amount,
        commission_fee: event.commission_fee,
        counterparty_name: receiver.name.clone(),
        completed_at: event.completed_at,
    };

    let credit = Notice {
        kind: NoticeKind::Credit,
        recipient_name: receiver.name.clone(),
        recipient_email: receiver.email.clone(),
        subject: format!("You received {:.2} from {}", event.amount, sender.name),
        transaction_id: event.transaction_id,
        amount: event.amount,
        commission_fee: Decimal::ZERO,
        counterparty_name: sender.name.clone(),
        completed_at: event.completed_at,
    };

    [debit, credit]
}

/// Delivery errors. Never surfaced to the transfer caller.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Recipient not found: {0}")]
    RecipientMissing(i64),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Outbound mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, notice: &Notice) -> Result<(), DeliveryError>;
}

/// Mailer that writes notices to the log instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, notice: &Notice) -> Result<(), DeliveryError> {
        tracing::info!(
            kind = ?notice.kind,
            to = %notice.recipient_email,
            transaction_id = notice.transaction_id,
            amount = %notice.amount,
            subject = %notice.subject,
            "Transfer notice delivered"
        );
        Ok(())
    }
}
