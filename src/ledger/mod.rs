//! Ledger module
//!
//! Persistence for account balances and the append-only transaction table.

mod models;
mod store;

pub use models::{AccountRow, LockedPair, NewTransaction, TransactionRecord};
pub use store::LedgerStore;
