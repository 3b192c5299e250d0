//! # Bank Types
//!
//! Domain types and port traits for the streaming bank service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Account, Transaction, ExchangeRate, Transfer)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Request and response messages for the HTTP and streaming surfaces
//! - `error/` - Domain, repository, application and transfer error types
//! - `status/` - Structured error status and the stream frame envelope

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;
pub mod status;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, ExchangeRate, ExchangeRateId, NewExchangeRate, Transaction,
    TransactionDirection, TransactionId, Transfer, TransferId, TransferStatus, next_balance,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError, TransferError};
pub use exchange_rates::{BASE_CURRENCY, CurrencyCode, UnknownCurrency, truncate_to_second};
pub use ports::BankRepository;
pub use status::{Code, ErrorDetail, FieldViolation, Frame, PreconditionViolation, Status};
