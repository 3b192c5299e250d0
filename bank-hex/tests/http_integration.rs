//! End-to-end tests of the unary HTTP routes over an in-memory SQLite store.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use bank_hex::{BankService, inbound::HttpServer};
use bank_repo::SqliteRepo;
use bank_types::{CurrencyCode, NewExchangeRate, TransactionDirection};
use chrono::{TimeDelta, Utc};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Router plus a second service handle over the same store for seeding.
async fn setup() -> (Router, BankService<SqliteRepo>) {
    let repo = Arc::new(SqliteRepo::new("sqlite::memory:").await.unwrap());
    let server = HttpServer::with_config(
        BankService::from_shared(repo.clone()),
        1_000,
        Duration::from_secs(3),
    );
    (server.router(), BankService::from_shared(repo))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn create_account(app: &Router, number: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/accounts",
        Some(json!({ "account_number": number, "account_name": "Alice" })),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let (app, _) = setup().await;

    let (status, body) = call(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_and_get_account() {
    let (app, _) = setup().await;

    let (status, created) = create_account(&app, "1001").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["account_number"], "1001");
    assert_eq!(created["currency"], "USD");
    assert_eq!(created["balance"], "0");

    let (status, fetched) = call(&app, Method::GET, "/api/accounts/1001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
}

#[tokio::test]
async fn test_duplicate_account_is_rejected() {
    let (app, _) = setup().await;
    create_account(&app, "1001").await;

    let (status, body) = create_account(&app, "1001").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_unknown_account_returns_structured_status() {
    let (app, _) = setup().await;

    let (status, body) = call(&app, Method::GET, "/api/accounts/4040", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["details"][0]["@type"], "error_info");
    assert_eq!(body["details"][0]["reason"], "NOT_FOUND");
}

#[tokio::test]
async fn test_balance_includes_idr_value() {
    let (app, service) = setup().await;
    create_account(&app, "1001").await;
    service
        .ledger()
        .apply("1001", dec!(10), TransactionDirection::In, "deposit", None)
        .await
        .unwrap();
    let now = Utc::now();
    service
        .rates()
        .record(NewExchangeRate {
            from_currency: CurrencyCode::USD,
            to_currency: CurrencyCode::IDR,
            rate: dec!(2100),
            valid_from: now - TimeDelta::minutes(1),
            valid_to: now + TimeDelta::minutes(1),
        })
        .await
        .unwrap();

    let (status, body) = call(&app, Method::GET, "/api/accounts/1001/balance", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], "10");
    assert_eq!(body["amount_converted"], "21000");
    assert_eq!(body["converted_currency"], "IDR");
}

#[tokio::test]
async fn test_balance_without_rate_is_not_found() {
    let (app, _) = setup().await;
    create_account(&app, "1001").await;

    let (status, body) = call(&app, Method::GET, "/api/accounts/1001/balance", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("Exchange rate"));
}

#[tokio::test]
async fn test_transaction_history() {
    let (app, service) = setup().await;
    create_account(&app, "1001").await;
    let ledger = service.ledger();
    ledger
        .apply("1001", dec!(10), TransactionDirection::In, "in", None)
        .await
        .unwrap();
    ledger
        .apply("1001", dec!(4), TransactionDirection::Out, "out", None)
        .await
        .unwrap();

    let (status, body) = call(&app, Method::GET, "/api/accounts/1001/transactions", None).await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["type"], "IN");
    assert_eq!(rows[1]["type"], "OUT");
}

#[tokio::test]
async fn test_transfer_record_lookup() {
    let (app, service) = setup().await;
    create_account(&app, "1001").await;
    create_account(&app, "1002").await;
    service
        .ledger()
        .apply("1001", dec!(10), TransactionDirection::In, "", None)
        .await
        .unwrap();
    let (id, _) = service
        .transfers()
        .transfer("1001", "1002", "USD", dec!(4), "rent")
        .await
        .unwrap();

    let (status, body) = call(&app, Method::GET, &format!("/api/transfers/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SUCCEEDED");
    assert_eq!(body["amount"], "4");

    let (status, _) = call(&app, Method::GET, "/api/transfers/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (app, _) = setup().await;

    let (status, body) = call(&app, Method::GET, "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/accounts/{number}/balance"].is_object());
}
