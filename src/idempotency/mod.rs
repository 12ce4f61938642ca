//! Idempotency module
//!
//! Prevents duplicate transfer processing using idempotency keys.

mod repository;

pub use repository::{IdempotencyError, IdempotencyKey, IdempotencyRepository};
