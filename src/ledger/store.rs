//! Ledger Store
//!
//! Row-level access to account balances and the append-only transaction
//! table. Every mutating call takes the caller's open transaction, so the
//! transfer engine decides where the atomic scope begins and ends.

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{AccountRow, NewTransaction, TransactionRecord};

/// Storage access for accounts and ledger rows
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: PgPool,
}

impl LedgerStore {
    /// Create a new LedgerStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Atomic scope
    // =========================================================================

    /// Open a transaction whose lock waits give up after `lock_timeout`
    pub async fn begin(
        &self,
        lock_timeout: Duration,
    ) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // SET LOCAL does not take bind parameters; set_config(.., true) is the same thing.
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }

    /// Exclusively lock both parties' rows.
    ///
    /// Rows are locked in ascending id order, so two transfers touching the
    /// same pair in opposite directions queue instead of deadlocking.
    /// Missing ids are simply absent from the result.
    pub async fn lock_pair(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        sender_id: i64,
        receiver_id: i64,
    ) -> Result<Vec<AccountRow>, sqlx::Error> {
        sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, name, balance
            FROM users
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(vec![sender_id, receiver_id])
        .fetch_all(&mut **tx)
        .await
    }

    // =========================================================================
    // Balance mutation
    // =========================================================================

    /// Subtract `total` from an account, returning the new balance
    pub async fn debit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: i64,
        total: Decimal,
    ) -> Result<Decimal, sqlx::Error> {
        self.adjust_balance(tx, account_id, -total).await
    }

    /// Add `amount` to an account, returning the new balance
    pub async fn credit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: i64,
        amount: Decimal,
    ) -> Result<Decimal, sqlx::Error> {
        self.adjust_balance(tx, account_id, amount).await
    }

    async fn adjust_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: i64,
        change: Decimal,
    ) -> Result<Decimal, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE users
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING balance
            "#,
        )
        .bind(account_id)
        .bind(change)
        .fetch_one(&mut **tx)
        .await
    }

    // =========================================================================
    // Ledger rows
    // =========================================================================

    /// Append a transaction row
    pub async fn insert_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new: &NewTransaction,
    ) -> Result<TransactionRecord, sqlx::Error> {
        sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO transactions (sender_id, receiver_id, amount, commission_fee, completed_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, sender_id, receiver_id, amount, commission_fee, completed_at
            "#,
        )
        .bind(new.sender_id)
        .bind(new.receiver_id)
        .bind(new.amount)
        .bind(new.commission_fee)
        .bind(new.completed_at)
        .fetch_one(&mut **tx)
        .await
    }

    /// Load a transaction row inside an open scope
    pub async fn find_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        transaction_id: i64,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT id, sender_id, receiver_id, amount, commission_fee, completed_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&mut **tx)
        .await
    }
}
