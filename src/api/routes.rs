//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::domain::{Amount, DomainError, OperationContext};
use crate::error::{AppError, AppResult};
use crate::handlers::{TransferCommand, TransferResult};
use crate::query::{Page, TransactionView};
use crate::state::AppState;

use super::middleware::AuthenticatedUser;

// =========================================================================
// Request/Response types
// =========================================================================

/// Amount as sent by clients: `"100.50"` or `100.5`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn parse(&self) -> Result<Amount, DomainError> {
        let parsed = match self {
            AmountInput::Text(s) => s.parse::<Amount>(),
            AmountInput::Number(n) => n.to_string().parse::<Amount>(),
        };
        parsed.map_err(DomainError::from)
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub receiver_id: i64,
    pub amount: AmountInput,
}

#[derive(Debug, Serialize)]
pub struct TransferSummary {
    pub id: i64,
    pub amount: Decimal,
    pub commission_fee: Decimal,
    pub receiver_id: i64,
    pub receiver_name: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub message: String,
    pub transaction: TransferSummary,
    pub new_balance: Decimal,
    pub replayed: bool,
}

impl From<TransferResult> for TransferResponse {
    fn from(result: TransferResult) -> Self {
        let message = if result.replayed {
            "Transfer already processed"
        } else {
            "Transfer completed successfully"
        };

        Self {
            message: message.to_string(),
            transaction: TransferSummary {
                id: result.transaction.id,
                amount: result.transaction.amount,
                commission_fee: result.transaction.commission_fee,
                receiver_id: result.transaction.receiver_id,
                receiver_name: result.receiver_name,
                completed_at: result.transaction.completed_at,
            },
            new_balance: result.new_balance,
            replayed: result.replayed,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub balance: Decimal,
    pub transactions: Page<TransactionView>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub balance: Decimal,
}

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Optional `Idempotency-Key`; present but not a UUID is a client error
fn idempotency_key(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    let Some(value) = headers.get(IDEMPOTENCY_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(Some)
        .ok_or_else(|| AppError::InvalidRequest("Idempotency-Key must be a UUID".to_string()))
}

// =========================================================================
// API Router
// =========================================================================

/// Authenticated routes, mounted under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/transfers", post(transfer))
        .route("/transactions", get(list_transactions))
        .route("/transactions/:transaction_id", get(get_transaction))
        .route("/balance", get(get_balance))
}

// =========================================================================
// POST /transfers
// =========================================================================

/// Transfer from the authenticated user to `receiver_id`
async fn transfer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> AppResult<Json<TransferResponse>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let idem_key = idempotency_key(&headers)?;
    let amount = request.amount.parse()?;

    let command = TransferCommand::new(user.user_id, request.receiver_id, amount);
    let result = state.transfers.execute(command, idem_key, &context).await?;

    Ok(Json(result.into()))
}

// =========================================================================
// GET /transactions
// =========================================================================

/// Paginated history plus current balance
async fn list_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> AppResult<Json<TransactionsResponse>> {
    let Query(query) = query.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let balance = state
        .queries
        .balance(user.user_id)
        .await?
        .ok_or(DomainError::AccountNotFound(user.user_id))?;

    let transactions = state
        .queries
        .list_transactions(user.user_id, query.page, query.per_page)
        .await?;

    Ok(Json(TransactionsResponse {
        balance,
        transactions,
    }))
}

// =========================================================================
// GET /transactions/:transaction_id
// =========================================================================

async fn get_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<TransactionView>> {
    let Path(transaction_id) = path.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    // Transactions of other users are indistinguishable from missing ones
    let view = state
        .queries
        .get_transaction(user.user_id, transaction_id)
        .await?
        .ok_or(AppError::TransactionNotFound(transaction_id))?;

    Ok(Json(view))
}

// =========================================================================
// GET /balance
// =========================================================================

async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<BalanceResponse>> {
    let balance = state
        .queries
        .balance(user.user_id)
        .await?
        .ok_or(DomainError::AccountNotFound(user.user_id))?;

    Ok(Json(BalanceResponse {
        user_id: user.user_id,
        balance,
    }))
}

// =========================================================================
// Health
// =========================================================================

/// Liveness
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness: healthy only when the database answers
pub async fn readiness_check(State(pool): State<PgPool>) -> Response {
    match db::verify_connection(&pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "connected" })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "unreachable" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionRecord;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_request_accepts_string_amount() {
        let req: TransferRequest =
            serde_json::from_str(r#"{"receiver_id": 2, "amount": "100.50"}"#).unwrap();

        assert_eq!(req.receiver_id, 2);
        assert_eq!(req.amount.parse().unwrap().value(), dec!(100.50));
    }

    #[test]
    fn test_transfer_request_accepts_numeric_amount() {
        let req: TransferRequest =
            serde_json::from_str(r#"{"receiver_id": 2, "amount": 100.5}"#).unwrap();

        assert_eq!(req.amount.parse().unwrap().value(), dec!(100.50));

        let req: TransferRequest =
            serde_json::from_str(r#"{"receiver_id": 2, "amount": 25}"#).unwrap();

        assert_eq!(req.amount.parse().unwrap().value(), dec!(25.00));
    }

    #[test]
    fn test_transfer_request_rejects_bad_amounts() {
        for body in [
            r#"{"receiver_id": 2, "amount": "0"}"#,
            r#"{"receiver_id": 2, "amount": "-5"}"#,
            r#"{"receiver_id": 2, "amount": "1.001"}"#,
            r#"{"receiver_id": 2, "amount": "abc"}"#,
            r#"{"receiver_id": 2, "amount": "1000000000.00"}"#,
        ] {
            let req: TransferRequest = serde_json::from_str(body).unwrap();
            assert!(
                matches!(req.amount.parse(), Err(DomainError::InvalidAmount(_))),
                "accepted {}",
                body
            );
        }
    }

    #[test]
    fn test_idempotency_key_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(idempotency_key(&headers).unwrap(), None);

        let key = Uuid::new_v4();
        headers.insert("Idempotency-Key", key.to_string().parse().unwrap());
        assert_eq!(idempotency_key(&headers).unwrap(), Some(key));

        headers.insert("Idempotency-Key", "not-a-uuid".parse().unwrap());
        assert!(matches!(
            idempotency_key(&headers),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_transfer_response_shape() {
        let result = TransferResult {
            transaction: TransactionRecord {
                id: 9,
                sender_id: 1,
                receiver_id: 2,
                amount: dec!(100.00),
                commission_fee: dec!(1.50),
                completed_at: Utc::now(),
            },
            receiver_name: "Bob".into(),
            new_balance: dec!(898.50),
            replayed: false,
        };

        let body = serde_json::to_value(TransferResponse::from(result)).unwrap();

        assert_eq!(body["message"], "Transfer completed successfully");
        assert_eq!(body["transaction"]["id"], 9);
        assert_eq!(body["transaction"]["amount"], "100.00");
        assert_eq!(body["transaction"]["commission_fee"], "1.50");
        assert_eq!(body["transaction"]["receiver_name"], "Bob");
        assert_eq!(body["new_balance"], "898.50");
        assert_eq!(body["replayed"], false);
    }
}
