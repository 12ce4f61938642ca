//! Idempotency Repository
//!
//! Maps client-supplied idempotency keys to the transaction they produced,
//! so a retried transfer replays instead of moving money twice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Stored idempotency key information
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdempotencyKey {
    pub key: Uuid,
    pub user_id: i64,
    pub request_hash: String,
    pub transaction_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Idempotency Repository Error
#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Request hash mismatch for key {0}")]
    HashMismatch(Uuid),
}

/// Repository for managing idempotency keys
#[derive(Debug, Clone)]
pub struct IdempotencyRepository {
    pool: PgPool,
}

impl IdempotencyRepository {
    /// Create a new IdempotencyRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get an unexpired idempotency key inside an open scope
    pub async fn get(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key: Uuid,
    ) -> Result<Option<IdempotencyKey>, IdempotencyError> {
        let record = sqlx::query_as::<_, IdempotencyKey>(
            r#"
            SELECT key, user_id, request_hash, transaction_id, created_at, expires_at
            FROM idempotency_keys
            WHERE key = $1
              AND expires_at > NOW()
            "#,
        )
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(record)
    }

    /// Look up a key and verify it was used for the same request.
    ///
    /// Returns the transaction to replay, `None` for an unused key, or
    /// `HashMismatch` when the key was used for a different request.
    pub async fn check(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key: Uuid,
        request_hash: &str,
    ) -> Result<Option<i64>, IdempotencyError> {
        match self.get(tx, key).await? {
            Some(existing) if existing.request_hash != request_hash => {
                Err(IdempotencyError::HashMismatch(key))
            }
            Some(existing) => Ok(Some(existing.transaction_id)),
            None => Ok(None),
        }
    }

    /// Record a key against the transaction it produced.
    ///
    /// Must run in the same scope as the transaction insert. An expired
    /// row not yet purged is taken over. Returns `false` when the key is
    /// live for another transaction, in which case the caller must roll
    /// the transfer back.
    pub async fn record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key: Uuid,
        user_id: i64,
        request_hash: &str,
        transaction_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (key, user_id, request_hash, transaction_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                request_hash = EXCLUDED.request_hash,
                transaction_id = EXCLUDED.transaction_id,
                created_at = DEFAULT,
                expires_at = DEFAULT
            WHERE idempotency_keys.expires_at <= NOW()
            "#,
        )
        .bind(key)
        .bind(user_id)
        .bind(request_hash)
        .bind(transaction_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        Ok(rows == 1)
    }

    /// Delete expired idempotency keys
    pub async fn cleanup_expired(&self) -> Result<u64, IdempotencyError> {
        let rows = sqlx::query(
            r#"
            DELETE FROM idempotency_keys
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }

    /// Compute SHA-256 hash of the transfer parameters for conflict detection
    pub fn compute_request_hash(sender_id: i64, receiver_id: i64, amount: Decimal) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}:{:.2}", sender_id, receiver_id, amount).as_bytes());
        hex::encode(hasher.finalize())
    }
}
