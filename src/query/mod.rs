//! Query module
//!
//! Read path over the ledger: paginated history annotated per viewer.

mod service;
mod view;

pub use service::TransactionQueryService;
pub use view::{last_page, Direction, Page, TransactionRow, TransactionView};
