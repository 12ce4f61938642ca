//! Command Handlers module
//!
//! Handlers that orchestrate state-changing business operations.

mod commands;
mod transfer_handler;

pub use commands::*;
pub use transfer_handler::TransferHandler;
