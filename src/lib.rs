//! wallet_ledger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod handlers;
pub mod idempotency;
pub mod jobs;
pub mod ledger;
pub mod notification;
pub mod query;
pub mod state;

pub use config::Config;
pub use domain::{Amount, AmountError, CommissionPolicy, DomainError, OperationContext};
pub use domain::TransferCompleted;
pub use error::{AppError, AppResult};
pub use state::AppState;
