//! API Integration Tests
//!
//! Drive the full router, auth included. Need a Postgres DATABASE_URL.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::util::ServiceExt;

use wallet_ledger::api;
use wallet_ledger::domain::{Amount, OperationContext};
use wallet_ledger::handlers::TransferCommand;
use wallet_ledger::notification::NotificationDispatcher;
use wallet_ledger::{AppState, Config};

mod common;

fn test_state(pool: PgPool) -> AppState {
    let config = Config::from_lookup(|key| {
        (key == "DATABASE_URL").then(|| "postgres://configured-by-test".to_string())
    })
    .unwrap();
    let (notifier, _events) = NotificationDispatcher::channel(64);
    AppState::new(pool, &config, notifier)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn post_transfer(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/transfers")
        .header("content-type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_transfer_e2e() {
    let Some(pool) = common::setup_test_db().await else { return };
    let alice = common::create_user(&pool, "alice", dec!(1000.00)).await;
    let bob = common::create_user(&pool, "bob", dec!(0.00)).await;
    let alice_token = common::create_token(&pool, alice).await;
    let bob_token = common::create_token(&pool, bob).await;
    let app = api::build_app(test_state(pool.clone()));

    // 1. Transfer
    let (status, body) = send(
        &app,
        post_transfer(&alice_token, json!({ "receiver_id": bob, "amount": "100.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "transfer failed: {}", body);
    assert_eq!(body["message"], "Transfer completed successfully");
    assert_eq!(body["transaction"]["amount"], "100.00");
    assert_eq!(body["transaction"]["commission_fee"], "1.50");
    assert_eq!(body["transaction"]["receiver_id"], bob);
    assert_eq!(body["transaction"]["receiver_name"], "bob");
    assert_eq!(body["new_balance"], "898.50");
    assert_eq!(body["replayed"], false);
    let transaction_id = body["transaction"]["id"].as_i64().unwrap();

    // 2. Sender balance
    let (status, body) = send(&app, get("/api/balance", &alice_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "898.50");

    // 3. Receiver sees it as received
    let (status, body) = send(&app, get("/api/transactions", &bob_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "100.00");
    assert_eq!(body["transactions"]["total"], 1);
    let entry = &body["transactions"]["data"][0];
    assert_eq!(entry["id"], transaction_id);
    assert_eq!(entry["direction"], "received");
    assert_eq!(entry["counterparty_id"], alice);
    assert_eq!(entry["counterparty_name"], "alice");

    // 4. Single transaction lookup
    let uri = format!("/api/transactions/{}", transaction_id);
    let (status, body) = send(&app, get(&uri, &alice_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["direction"], "sent");

    // Outsiders cannot see it
    let carol = common::create_user(&pool, "carol", dec!(0.00)).await;
    let carol_token = common::create_token(&pool, carol).await;
    let (status, body) = send(&app, get(&uri, &carol_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "transaction_not_found");
}

#[tokio::test]
async fn test_numeric_amount_and_idempotency_header() {
    let Some(pool) = common::setup_test_db().await else { return };
    let alice = common::create_user(&pool, "alice", dec!(1000.00)).await;
    let bob = common::create_user(&pool, "bob", dec!(0.00)).await;
    let token = common::create_token(&pool, alice).await;
    let app = api::build_app(test_state(pool.clone()));
    let key = uuid::Uuid::new_v4().to_string();

    let request = || {
        Request::builder()
            .method("POST")
            .uri("/api/transfers")
            .header("content-type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .header("Idempotency-Key", key.as_str())
            .body(Body::from(json!({ "receiver_id": bob, "amount": 20.5 }).to_string()))
            .unwrap()
    };

    let (status, first) = send(&app, request()).await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    assert_eq!(first["transaction"]["amount"], "20.50");

    let (status, second) = send(&app, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["replayed"], true);
    assert_eq!(second["transaction"]["id"], first["transaction"]["id"]);

    assert_eq!(common::sent_count(&pool, alice).await, 1);
}

#[tokio::test]
async fn test_transfer_validation_errors() {
    let Some(pool) = common::setup_test_db().await else { return };
    let alice = common::create_user(&pool, "alice", dec!(50.00)).await;
    let bob = common::create_user(&pool, "bob", dec!(0.00)).await;
    let token = common::create_token(&pool, alice).await;
    let app = api::build_app(test_state(pool.clone()));

    let cases = [
        (json!({ "receiver_id": bob, "amount": "0.001" }), "invalid_amount"),
        (json!({ "receiver_id": bob, "amount": "-1" }), "invalid_amount"),
        (json!({ "receiver_id": alice, "amount": "1.00" }), "same_account_transfer"),
        (json!({ "receiver_id": bob, "amount": "100.00" }), "insufficient_balance"),
        (json!({ "receiver_id": i64::MAX, "amount": "1.00" }), "account_not_found"),
        (json!({ "amount": "1.00" }), "invalid_request"),
    ];

    for (payload, code) in cases {
        let (status, body) = send(&app, post_transfer(&token, payload.clone())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", payload);
        assert_eq!(body["error_code"], code, "{}", payload);
    }

    let bad_key = Request::builder()
        .method("POST")
        .uri("/api/transfers")
        .header("content-type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .header("Idempotency-Key", "not-a-uuid")
        .body(Body::from(json!({ "receiver_id": bob, "amount": "1.00" }).to_string()))
        .unwrap();
    let (status, _) = send(&app, bad_key).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing moved
    assert_eq!(common::balance_of(&pool, alice).await, dec!(50.00));
    assert_eq!(common::sent_count(&pool, alice).await, 0);
}

#[tokio::test]
async fn test_transactions_pagination() {
    let Some(pool) = common::setup_test_db().await else { return };
    let alice = common::create_user(&pool, "alice", dec!(10000.00)).await;
    let token = common::create_token(&pool, alice).await;
    let state = test_state(pool.clone());
    let app = api::build_app(state.clone());

    let mut receivers = Vec::new();
    for i in 1..=25 {
        let receiver = common::create_user(&pool, &format!("receiver-{}", i), dec!(0.00)).await;
        let amount = Amount::new(rust_decimal::Decimal::new(100 + i, 2)).unwrap();
        let result = state
            .transfers
            .execute(
                TransferCommand::new(alice, receiver, amount),
                None,
                &OperationContext::new(),
            )
            .await
            .unwrap();
        receivers.push((receiver, result.transaction.id));
    }

    let mut seen = Vec::new();
    for (page, expected) in [(1, 10), (2, 10), (3, 5)] {
        let uri = format!("/api/transactions?page={}&per_page=10", page);
        let (status, body) = send(&app, get(&uri, &token)).await;
        assert_eq!(status, StatusCode::OK);

        let listing = &body["transactions"];
        assert_eq!(listing["total"], 25);
        assert_eq!(listing["current_page"], page);
        assert_eq!(listing["per_page"], 10);
        assert_eq!(listing["last_page"], 3);

        let data = listing["data"].as_array().unwrap();
        assert_eq!(data.len(), expected);
        seen.extend(data.iter().map(|t| t["id"].as_i64().unwrap()));
    }

    // Newest first, no duplicates across pages
    let mut sorted = seen.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();
    assert_eq!(seen, sorted);
    assert_eq!(seen.len(), 25);

    // Listing again returns the same page
    let (_, first) = send(&app, get("/api/transactions?page=1&per_page=10", &token)).await;
    let (_, again) = send(&app, get("/api/transactions?page=1&per_page=10", &token)).await;
    assert_eq!(first["transactions"]["data"], again["transactions"]["data"]);

    // Past the end is an empty page, not an error
    let (status, body) = send(&app, get("/api/transactions?page=9&per_page=10", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"]["data"].as_array().unwrap().len(), 0);

    // Each receiver sees only its own incoming transfer
    for (receiver, transaction_id) in receivers.iter().step_by(6) {
        let receiver_token = common::create_token(&pool, *receiver).await;
        let (status, body) = send(&app, get("/api/transactions", &receiver_token)).await;
        assert_eq!(status, StatusCode::OK);

        let listing = &body["transactions"];
        assert_eq!(listing["total"], 1);
        assert_eq!(listing["last_page"], 1);
        let entry = &listing["data"][0];
        assert_eq!(entry["id"], *transaction_id);
        assert_eq!(entry["direction"], "received");
        assert_eq!(entry["counterparty_id"], alice);
    }
}

#[tokio::test]
async fn test_unauthorized_requests() {
    let Some(pool) = common::setup_test_db().await else { return };
    let app = api::build_app(test_state(pool.clone()));

    let no_token = Request::builder()
        .uri("/api/transactions")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, no_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "unauthorized");

    let (status, _) = send(&app, get("/api/balance", "no-such-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Revoked tokens stop working
    let alice = common::create_user(&pool, "alice", dec!(0.00)).await;
    let token = common::create_token(&pool, alice).await;
    let (status, _) = send(&app, get("/api/balance", &token)).await;
    assert_eq!(status, StatusCode::OK);

    sqlx::query("UPDATE access_tokens SET revoked = TRUE WHERE user_id = $1")
        .bind(alice)
        .execute(&pool)
        .await
        .unwrap();
    let (status, _) = send(&app, get("/api/balance", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let Some(pool) = common::setup_test_db().await else { return };
    let app = api::build_app(test_state(pool));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");

    let (status, body) = send(
        &app,
        Request::builder().uri("/api/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}
