//! HTTP and WebSocket request handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use bank_types::{
    AccountResponse, AppError, BankRepository, Code, CreateAccountRequest, ExchangeRateRequest,
    HealthResponse, Status, TransactionMessage, TransactionResponse, TransferId,
    TransferRecordResponse, TransferRequest,
};

use super::ws;
use crate::BankService;
use crate::rpc::{self, status};

/// Application state shared across handlers.
pub struct AppState<R: BankRepository> {
    pub service: BankService<R>,
    /// Interval between rate feed messages
    pub rate_tick: Duration,
}

/// Wrapper to implement IntoResponse for Status (orphan rule workaround).
#[derive(Debug)]
pub struct ApiError(pub Status);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(status::from_app_error(&err))
    }
}

impl From<Status> for ApiError {
    fn from(status: Status) -> Self {
        ApiError(status)
    }
}

fn http_status(code: Code) -> StatusCode {
    match code {
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::FailedPrecondition => StatusCode::UNPROCESSABLE_ENTITY,
        Code::Internal | Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (http_status(self.0.code), Json(self.0)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(account_number = %req.account_number))]
pub async fn create_account<R: BankRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.service.ledger().create_account(req).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

#[tracing::instrument(skip(state))]
pub async fn get_account<R: BankRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.service.ledger().detail(&number).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// Current balance with its USD to IDR value.
#[tracing::instrument(skip(state))]
pub async fn get_balance<R: BankRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state.service.current_balance(&number).await?;
    Ok(Json(balance))
}

#[tracing::instrument(skip(state))]
pub async fn list_transactions<R: BankRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state.service.ledger().history(&number).await?;
    let body: Vec<TransactionResponse> = transactions.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

#[tracing::instrument(skip(state))]
pub async fn get_transfer<R: BankRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transfer_id: TransferId = id
        .parse()
        .map_err(|_| AppError::invalid_argument("id", "Invalid transfer ID"))?;

    let transfer = state.service.transfer_record(transfer_id).await?;
    Ok(Json(TransferRecordResponse::from(transfer)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Streams
// ─────────────────────────────────────────────────────────────────────────────

pub async fn exchange_rates<R: BankRepository>(
    State(state): State<Arc<AppState<R>>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| {
        ws::serve_server_stream(socket, move |ctx, req: ExchangeRateRequest, out| async move {
            rpc::fetch_exchange_rates(state.service.rates(), ctx, req, state.rate_tick, out).await
        })
    })
}

pub async fn summarize_transactions<R: BankRepository>(
    State(state): State<Arc<AppState<R>>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| {
        ws::serve_stream(
            socket,
            move |ctx, inbound: ws::Inbound<TransactionMessage>, out| async move {
                rpc::summarize_transactions::<R, _>(state.service.ledger(), ctx, inbound, out)
                    .await
            },
        )
    })
}

pub async fn transfer_multiple<R: BankRepository>(
    State(state): State<Arc<AppState<R>>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| {
        ws::serve_stream(socket, move |ctx, inbound: ws::Inbound<TransferRequest>, out| async move {
            rpc::transfer_multiple::<R, _>(state.service.transfers(), ctx, inbound, out).await
        })
    })
}
