//! Transfer Handler
//!
//! Executes one peer-to-peer transfer as a single atomic unit of work.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::TransferConfig;
use crate::domain::{DomainError, OperationContext, TransferCompleted};
use crate::error::AppError;
use crate::idempotency::{IdempotencyError, IdempotencyRepository};
use crate::ledger::{LedgerStore, LockedPair, NewTransaction, TransactionRecord};
use crate::notification::NotificationDispatcher;

use super::{TransferCommand, TransferResult};

/// Handler for balance transfers
#[derive(Debug, Clone)]
pub struct TransferHandler {
    store: LedgerStore,
    idempotency: IdempotencyRepository,
    notifier: NotificationDispatcher,
    config: TransferConfig,
}

impl TransferHandler {
    pub fn new(pool: PgPool, config: TransferConfig, notifier: NotificationDispatcher) -> Self {
        Self {
            store: LedgerStore::new(pool.clone()),
            idempotency: IdempotencyRepository::new(pool),
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Execute the transfer command.
    ///
    /// Both rows are locked before the balance is read, so concurrent
    /// transfers from one sender run one after another and each sees the
    /// previous one's debit. Every early return drops the open transaction,
    /// which rolls it back.
    pub async fn execute(
        &self,
        command: TransferCommand,
        idempotency_key: Option<Uuid>,
        context: &OperationContext,
    ) -> Result<TransferResult, AppError> {
        let sender_id = command.sender_id;
        let receiver_id = command.receiver_id;

        if sender_id == receiver_id {
            return Err(DomainError::SameAccountTransfer.into());
        }

        let amount = command
            .amount
            .ensure_at_most(self.config.max_amount)
            .map_err(DomainError::from)?;

        let request_hash = idempotency_key.map(|_| {
            IdempotencyRepository::compute_request_hash(sender_id, receiver_id, amount.value())
        });

        let mut tx = self.store.begin(self.config.lock_timeout).await?;

        let rows = self.store.lock_pair(&mut tx, sender_id, receiver_id).await?;

        // Checked under the locks and before the parties are validated: a
        // retry racing its original waits above and then finds the committed
        // key here, and a reused key answers 409 whatever the new body names.
        let previous = match (idempotency_key, request_hash.as_deref()) {
            (Some(key), Some(hash)) => self.previous_transaction(&mut tx, key, hash).await?,
            _ => None,
        };

        let LockedPair { sender, receiver } = LockedPair::from_rows(rows, sender_id, receiver_id)
            .map_err(DomainError::AccountNotFound)?;

        if let Some(transaction) = previous {
            tx.rollback().await?;

            tracing::info!(
                transaction_id = transaction.id,
                sender_id,
                idempotency_key = ?idempotency_key,
                "Replayed transfer for repeated idempotency key"
            );

            return Ok(TransferResult {
                transaction,
                receiver_name: receiver.name,
                new_balance: sender.balance,
                replayed: true,
            });
        }

        let commission_fee = self.config.commission.commission_for(&amount);
        let total_debit = amount.value() + commission_fee;

        if sender.balance < total_debit {
            tx.rollback().await?;

            tracing::info!(
                sender_id,
                receiver_id,
                required = %total_debit,
                available = %sender.balance,
                "Transfer rejected: insufficient balance"
            );

            return Err(DomainError::insufficient_balance(total_debit, sender.balance).into());
        }

        let new_balance = self.store.debit(&mut tx, sender_id, total_debit).await?;
        self.store.credit(&mut tx, receiver_id, amount.value()).await?;

        let transaction = self
            .store
            .insert_transaction(
                &mut tx,
                &NewTransaction {
                    sender_id,
                    receiver_id,
                    amount: amount.value(),
                    commission_fee,
                    completed_at: Utc::now(),
                },
            )
            .await?;

        if let (Some(key), Some(hash)) = (idempotency_key, request_hash.as_deref()) {
            let recorded = self
                .idempotency
                .record(&mut tx, key, sender_id, hash, transaction.id)
                .await?;
            if !recorded {
                return Err(AppError::IdempotencyConflict);
            }
        }

        tx.commit().await?;

        tracing::info!(
            transaction_id = transaction.id,
            sender_id,
            receiver_id,
            amount = %transaction.amount,
            commission_fee = %transaction.commission_fee,
            correlation_id = ?context.correlation_id,
            "Transfer committed"
        );

        // Outside the atomic scope; a dropped notice does not undo the transfer.
        self.notifier.publish(TransferCompleted {
            transaction_id: transaction.id,
            sender_id,
            receiver_id,
            amount: transaction.amount,
            commission_fee: transaction.commission_fee,
            completed_at: transaction.completed_at,
        });

        Ok(TransferResult {
            transaction,
            receiver_name: receiver.name,
            new_balance,
            replayed: false,
        })
    }

    /// Transaction already produced under `key`, if the key is live.
    ///
    /// A live key seen with a different request is a conflict.
    async fn previous_transaction(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        key: Uuid,
        request_hash: &str,
    ) -> Result<Option<TransactionRecord>, AppError> {
        let existing = self
            .idempotency
            .check(tx, key, request_hash)
            .await
            .map_err(|e| match e {
                IdempotencyError::HashMismatch(_) => AppError::IdempotencyConflict,
                IdempotencyError::Database(e) => AppError::from(e),
            })?;

        let Some(transaction_id) = existing else {
            return Ok(None);
        };

        let transaction = self
            .store
            .find_transaction(tx, transaction_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "idempotency key {} points at missing transaction {}",
                    key, transaction_id
                ))
            })?;

        Ok(Some(transaction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Amount;
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;

    fn handler(config: TransferConfig) -> TransferHandler {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let (notifier, _receiver) = NotificationDispatcher::channel(1);
        TransferHandler::new(pool, config, notifier)
    }

    // These paths reject before the database is touched.

    #[tokio::test]
    async fn test_self_transfer_rejected() {
        let handler = handler(TransferConfig::default());
        let command = TransferCommand::new(7, 7, Amount::new(dec!(10)).unwrap());

        let err = handler
            .execute(command, None, &OperationContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Domain(DomainError::SameAccountTransfer)));
    }

    #[tokio::test]
    async fn test_amount_above_configured_max_rejected() {
        let handler = handler(TransferConfig {
            max_amount: dec!(500.00),
            ..TransferConfig::default()
        });
        let command = TransferCommand::new(1, 2, Amount::new(dec!(500.01)).unwrap());

        let err = handler
            .execute(command, None, &OperationContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Domain(DomainError::InvalidAmount(_))));
    }
}
