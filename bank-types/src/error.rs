//! Error types for the bank service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Domain-level errors (business logic violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Unknown transaction direction")]
    UnknownDirection,

    #[error("Invalid rate window: valid_from {valid_from} is after valid_to {valid_to}")]
    InvalidRateWindow {
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
    },

    #[error("Amount {amount} overflows balance {balance}")]
    AmountOverflow { balance: Decimal, amount: Decimal },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Service-level errors for the resolver and the ledger.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Invalid currency pair {from}/{to}")]
    InvalidCurrency { from: String, to: String },

    #[error("Invalid {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                available,
                requested,
            } => AppError::InsufficientFunds {
                available,
                requested,
            },
            DomainError::NegativeAmount => {
                AppError::invalid_argument("amount", "amount cannot be negative")
            }
            DomainError::UnknownDirection => {
                AppError::invalid_argument("type", "transaction type must be IN or OUT")
            }
            e @ DomainError::InvalidRateWindow { .. } => {
                AppError::invalid_argument("valid_from", e.to_string())
            }
            e @ DomainError::AmountOverflow { .. } => {
                AppError::invalid_argument("amount", e.to_string())
            }
            DomainError::ValidationError(msg) => AppError::invalid_argument("request", msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Conflict(e) => AppError::invalid_argument("account_number", e),
            RepoError::Database(e) => AppError::Unknown(e),
            RepoError::Transaction(e) => AppError::Unknown(e),
        }
    }
}

/// Errors returned by the transfer orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Source account not found: {0}")]
    SourceAccountNotFound(String),

    #[error("Destination account not found: {0}")]
    DestinationAccountNotFound(String),

    #[error("Failed to record transfer: {0}")]
    RecordFailed(String),

    #[error("Transaction pair failed: {0}")]
    TransactionPair(String),
}
