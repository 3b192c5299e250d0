//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use bank_types::domain::{
    AccountId, TransactionDirection, TransactionId, TransferId, TransferStatus,
};
use bank_types::dto::{
    AccountResponse, BalanceResponse, CreateAccountRequest, HealthResponse, TransactionResponse,
    TransferRecordResponse,
};
use bank_types::CurrencyCode;
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn health() {}

/// Provision an account with zero balance
#[utoipa::path(
    post,
    path = "/api/accounts",
    tag = "accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Invalid input or duplicate account number")
    )
)]
async fn create_account() {}

/// Get account by number
#[utoipa::path(
    get,
    path = "/api/accounts/{number}",
    tag = "accounts",
    params(
        ("number" = String, Path, description = "Account number")
    ),
    responses(
        (status = 200, description = "Account details", body = AccountResponse),
        (status = 404, description = "Account not found")
    )
)]
async fn get_account() {}

/// Current balance and its USD to IDR value at the time of the call
#[utoipa::path(
    get,
    path = "/api/accounts/{number}/balance",
    tag = "accounts",
    params(
        ("number" = String, Path, description = "Account number")
    ),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 404, description = "Account or exchange rate not found")
    )
)]
async fn get_balance() {}

/// Transaction history of an account, oldest first
#[utoipa::path(
    get,
    path = "/api/accounts/{number}/transactions",
    tag = "transactions",
    params(
        ("number" = String, Path, description = "Account number")
    ),
    responses(
        (status = 200, description = "Transactions", body = Vec<TransactionResponse>),
        (status = 404, description = "Account not found")
    )
)]
async fn list_transactions() {}

/// Stored transfer record
#[utoipa::path(
    get,
    path = "/api/transfers/{id}",
    tag = "transfers",
    params(
        ("id" = String, Path, description = "Transfer ID (UUID)")
    ),
    responses(
        (status = 200, description = "Transfer record", body = TransferRecordResponse),
        (status = 400, description = "Malformed transfer ID"),
        (status = 404, description = "Transfer not found")
    )
)]
async fn get_transfer() {}

/// OpenAPI documentation for the Bank API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bank Ledger Service API",
        version = "1.0.0",
        description = "Accounts, balances and transfers with time-windowed exchange rates.\n\n## Streams\n\nThree streaming calls are served over WebSocket with JSON frames `{\"type\":\"message\",\"payload\":...}`, `{\"type\":\"end\"}` and `{\"type\":\"error\",\"payload\":<status>}`:\n\n- `/rpc/exchange-rates`: send one `{from_currency, to_currency}` message, receive a rate every tick\n- `/rpc/transactions/summarize`: send transactions then `end`, receive one summary\n- `/rpc/transfers`: send transfers, receive one result per transfer\n\nSet the `x-client-id` header to get your own rate limit bucket.",
        license(name = "MIT"),
    ),
    paths(
        health,
        create_account,
        get_account,
        get_balance,
        list_transactions,
        get_transfer,
    ),
    components(
        schemas(
            CreateAccountRequest,
            AccountResponse,
            BalanceResponse,
            TransactionResponse,
            TransferRecordResponse,
            HealthResponse,
            TransactionDirection,
            TransferStatus,
            CurrencyCode,
            AccountId,
            TransactionId,
            TransferId,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "accounts", description = "Account provisioning and balances"),
        (name = "transactions", description = "Account transaction history"),
        (name = "transfers", description = "Transfer records"),
    )
)]
pub struct ApiDoc;
