//! Shared application state handed to every route.

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::handlers::TransferHandler;
use crate::notification::NotificationDispatcher;
use crate::query::TransactionQueryService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub transfers: TransferHandler,
    pub queries: TransactionQueryService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config, notifier: NotificationDispatcher) -> Self {
        Self {
            transfers: TransferHandler::new(pool.clone(), config.transfer_config(), notifier),
            queries: TransactionQueryService::new(pool.clone(), config.pagination_config()),
            pool,
        }
    }
}

// Lets middleware keep extracting `State<PgPool>`.
impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
