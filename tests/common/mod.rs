//! Common test utilities
#![allow(dead_code)]

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use wallet_ledger::api::middleware::hash_token;

/// Connect and migrate, or `None` when no DATABASE_URL is configured.
///
/// Tests create their own users so they can share one database.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    wallet_ledger::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Insert a user with a unique email and the given starting balance
pub async fn create_user(pool: &PgPool, name: &str, balance: Decimal) -> i64 {
    sqlx::query_scalar("INSERT INTO users (name, email, balance) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(format!("{}-{}@example.test", name, Uuid::new_v4()))
        .bind(balance)
        .fetch_one(pool)
        .await
        .expect("Failed to create user")
}

/// Issue a bearer token for `user_id` and return the plaintext
pub async fn create_token(pool: &PgPool, user_id: i64) -> String {
    let token = format!("test-{}", Uuid::new_v4().simple());

    sqlx::query("INSERT INTO access_tokens (user_id, token_hash) VALUES ($1, $2)")
        .bind(user_id)
        .bind(hash_token(&token))
        .execute(pool)
        .await
        .expect("Failed to create token");

    token
}

pub async fn balance_of(pool: &PgPool, user_id: i64) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

/// Ledger rows where `user_id` is the sender
pub async fn sent_count(pool: &PgPool, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE sender_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count transactions")
}
