//! Notification Dispatcher
//!
//! The transfer engine publishes `TransferCompleted` into a bounded channel
//! after commit. A background worker drains the channel, looks up both
//! parties and hands one notice each to the mailer. Nothing here can fail
//! or slow down a transfer.

use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::domain::TransferCompleted;

use super::mailer::{compose_notices, Contact, DeliveryError, Mailer, Notice};

/// Default delivery attempts per notice
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Publishing half of the notification queue
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<TransferCompleted>,
}

impl NotificationDispatcher {
    /// Create a dispatcher and the receiver its worker consumes
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TransferCompleted>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Queue an event without waiting.
    ///
    /// Returns `false` when the event was dropped (queue full or worker gone).
    pub fn publish(&self, event: TransferCompleted) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    event = event.event_type(),
                    transaction_id = event.transaction_id,
                    "Notification queue full, dropping transfer notice"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    event = event.event_type(),
                    transaction_id = event.transaction_id,
                    "Notification worker stopped, dropping transfer notice"
                );
                false
            }
        }
    }
}

/// Background consumer of the notification queue
pub struct NotificationWorker<M> {
    pool: PgPool,
    mailer: M,
    max_attempts: u32,
}

impl<M: Mailer + 'static> NotificationWorker<M> {
    pub fn new(pool: PgPool, mailer: M) -> Self {
        Self {
            pool,
            mailer,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Start draining `receiver` in the background.
    /// The task ends once every dispatcher handle has been dropped.
    pub fn start(self, receiver: mpsc::Receiver<TransferCompleted>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(receiver).await;
        })
    }

    async fn run(&self, mut receiver: mpsc::Receiver<TransferCompleted>) {
        tracing::info!("Notification worker started");

        while let Some(event) = receiver.recv().await {
            self.handle(&event).await;
        }

        tracing::info!("Notification queue closed, worker exiting");
    }

    async fn handle(&self, event: &TransferCompleted) {
        let (sender, receiver) = match self.load_contacts(event).await {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    transaction_id = event.transaction_id,
                    "Could not resolve transfer notice recipients"
                );
                return;
            }
        };

        for notice in compose_notices(event, &sender, &receiver) {
            if let Err(e) = deliver_with_retry(&self.mailer, &notice, self.max_attempts).await {
                tracing::error!(
                    error = %e,
                    transaction_id = event.transaction_id,
                    to = %notice.recipient_email,
                    "Transfer notice delivery failed"
                );
            }
        }
    }

    async fn load_contacts(
        &self,
        event: &TransferCompleted,
    ) -> Result<(Contact, Contact), DeliveryError> {
        let contacts = sqlx::query_as::<_, Contact>(
            "SELECT id, name, email FROM users WHERE id = ANY($1)",
        )
        .bind(vec![event.sender_id, event.receiver_id])
        .fetch_all(&self.pool)
        .await?;

        let find = |id: i64| {
            contacts
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or(DeliveryError::RecipientMissing(id))
        };

        Ok((find(event.sender_id)?, find(event.receiver_id)?))
    }
}

/// Deliver one notice, retrying with linear backoff
pub async fn deliver_with_retry<M: Mailer + ?Sized>(
    mailer: &M,
    notice: &Notice,
    max_attempts: u32,
) -> Result<(), DeliveryError> {
    let mut attempt = 1;
    loop {
        match mailer.deliver(notice).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    "Notice delivery failed, retrying (attempt {}/{})",
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
