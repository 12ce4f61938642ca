//! API Middleware
//!
//! Bearer token authentication and request logging.

use std::net::IpAddr;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::error::AppError;

/// Caller resolved from a valid access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub token_id: i64,
}

// =========================================================================
// Bearer token authentication
// =========================================================================

/// Extract the token from `Authorization: Bearer <token>`
pub fn parse_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}

/// Tokens are stored only as their SHA-256 hex digest
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Resolve the bearer token to a user and attach `AuthenticatedUser` and
/// `OperationContext` to the request.
pub async fn auth_middleware(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = match parse_bearer(&headers) {
        Some(token) => token,
        None => {
            tracing::debug!("Rejected request without bearer token");
            return Err(AppError::Unauthorized.into_response());
        }
    };

    let record: Option<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT id, user_id
        FROM access_tokens
        WHERE token_hash = $1
          AND NOT revoked
          AND (expires_at IS NULL OR expires_at > NOW())
        "#,
    )
    .bind(hash_token(token))
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::from(e).into_response())?;

    let (token_id, user_id) = match record {
        Some(record) => record,
        None => {
            tracing::debug!("Rejected request with unknown or expired token");
            return Err(AppError::Unauthorized.into_response());
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id, token_id });

    let mut context = OperationContext::new()
        .with_user(user_id)
        .with_token(token_id);

    // x-request-id is set upstream by SetRequestIdLayer
    if let Some(request_id) = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
    {
        context = context.with_correlation_id(request_id);
    }
    context.ensure_correlation_id();

    if let Some(ip) = forwarded_ip(&headers) {
        context = context.with_client_ip(ip);
    }

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "idempotency-key"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let headers = mask_headers_for_logging(request.headers());

    let (user_id, correlation_id) = request
        .extensions()
        .get::<OperationContext>()
        .map(|ctx| (ctx.user_id, ctx.correlation_id))
        .unwrap_or_default();

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        user_id = ?user_id,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
