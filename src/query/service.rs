//! Transaction Query Service
//!
//! Read-only, paginated history for one user. Never locks, never writes.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::config::PaginationConfig;

use super::view::{Page, TransactionRow, TransactionView};

/// Query service for a user's ledger history
#[derive(Debug, Clone)]
pub struct TransactionQueryService {
    pool: PgPool,
    config: PaginationConfig,
}

impl TransactionQueryService {
    /// Create a new TransactionQueryService
    pub fn new(pool: PgPool, config: PaginationConfig) -> Self {
        Self { pool, config }
    }

    /// Clamp client paging input to `(page, per_page)`
    pub fn resolve_page(&self, page: Option<u32>, per_page: Option<u32>) -> (u32, u32) {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(self.config.default_per_page)
            .clamp(1, self.config.max_per_page);
        (page, per_page)
    }

    /// List transactions where the user is sender or receiver, newest first.
    ///
    /// Ties on `completed_at` fall back to descending id so page boundaries
    /// stay stable between calls.
    pub async fn list_transactions(
        &self,
        user_id: i64,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<TransactionView>, sqlx::Error> {
        let (page, per_page) = self.resolve_page(page, per_page);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM transactions
            WHERE sender_id = $1 OR receiver_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT
                t.id, t.sender_id, t.receiver_id, t.amount, t.commission_fee, t.completed_at,
                s.name AS sender_name,
                r.name AS receiver_name
            FROM transactions t
            JOIN users s ON s.id = t.sender_id
            JOIN users r ON r.id = t.receiver_id
            WHERE t.sender_id = $1 OR t.receiver_id = $1
            ORDER BY t.completed_at DESC, t.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let data = rows
            .into_iter()
            .map(|row| TransactionView::for_viewer(row, user_id))
            .collect();

        Ok(Page::new(data, page, per_page, total))
    }

    /// One transaction, only if `user_id` is a party to it
    pub async fn get_transaction(
        &self,
        user_id: i64,
        transaction_id: i64,
    ) -> Result<Option<TransactionView>, sqlx::Error> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT
                t.id, t.sender_id, t.receiver_id, t.amount, t.commission_fee, t.completed_at,
                s.name AS sender_name,
                r.name AS receiver_name
            FROM transactions t
            JOIN users s ON s.id = t.sender_id
            JOIN users r ON r.id = t.receiver_id
            WHERE t.id = $1 AND (t.sender_id = $2 OR t.receiver_id = $2)
            "#,
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| TransactionView::for_viewer(row, user_id)))
    }

    /// Current balance of the user
    pub async fn balance(&self, user_id: i64) -> Result<Option<Decimal>, sqlx::Error> {
        sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }
}
