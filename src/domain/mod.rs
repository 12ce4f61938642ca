//! Domain module
//!
//! Core domain types and business logic.

pub mod amount;
pub mod commission;
pub mod context;
pub mod error;
pub mod events;

pub use amount::{Amount, AmountError, MONEY_SCALE};
pub use commission::{compute_commission, CommissionError, CommissionPolicy};
pub use context::OperationContext;
pub use error::DomainError;
pub use events::TransferCompleted;
