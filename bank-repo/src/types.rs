//! Shared database types with feature-gated fields for SQLite and PostgreSQL.
//!
//! SQLite has no native UUID, DECIMAL or TIMESTAMP types, so those columns
//! are stored as TEXT and parsed here. Timestamps are written with a fixed
//! width (microseconds, `Z` suffix) so that string comparison in SQL matches
//! chronological order.

use sqlx::FromRow;

use bank_types::{
    Account, AccountId, CurrencyCode, ExchangeRate, ExchangeRateId, RepoError, Transaction,
    TransactionDirection, TransactionId, Transfer, TransferId, TransferStatus,
};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use rust_decimal::Decimal;
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub account_number: String,
    pub account_name: String,
    pub currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub balance: Decimal,
    #[cfg(feature = "sqlite")]
    pub balance: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub updated_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub updated_at: String,
}

/// Transaction row from database.
#[derive(FromRow)]
pub struct DbTransaction {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub account_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub account_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub transaction_timestamp: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub transaction_timestamp: String,

    #[cfg(not(feature = "sqlite"))]
    pub amount: Decimal,
    #[cfg(feature = "sqlite")]
    pub amount: String,

    pub direction: String,
    pub notes: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

/// Exchange rate row from database.
#[derive(FromRow)]
pub struct DbExchangeRate {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub from_currency: String,
    pub to_currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub rate: Decimal,
    #[cfg(feature = "sqlite")]
    pub rate: String,

    #[cfg(not(feature = "sqlite"))]
    pub valid_from: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub valid_from: String,

    #[cfg(not(feature = "sqlite"))]
    pub valid_to: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub valid_to: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

/// Transfer row from database.
#[derive(FromRow)]
pub struct DbTransfer {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub from_account_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub from_account_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub to_account_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub to_account_id: String,

    pub currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub amount: Decimal,
    #[cfg(feature = "sqlite")]
    pub amount: String,

    pub notes: String,

    #[cfg(not(feature = "sqlite"))]
    pub transfer_timestamp: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub transfer_timestamp: String,

    pub status: String,
}

/// Balance-only row for queries.
#[derive(FromRow)]
pub struct DbBalance {
    #[cfg(not(feature = "sqlite"))]
    pub balance: Decimal,
    #[cfg(feature = "sqlite")]
    pub balance: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<CurrencyCode, RepoError> {
    s.parse()
        .map_err(|e: bank_types::UnknownCurrency| RepoError::Database(e.to_string()))
}

pub fn parse_direction(s: &str) -> Result<TransactionDirection, RepoError> {
    match TransactionDirection::from(s) {
        TransactionDirection::Unknown => Err(RepoError::Database(format!(
            "Unknown transaction direction: {}",
            s
        ))),
        direction => Ok(direction),
    }
}

pub fn parse_transfer_status(s: &str) -> Result<TransferStatus, RepoError> {
    match s {
        "PENDING" => Ok(TransferStatus::Pending),
        "SUCCEEDED" => Ok(TransferStatus::Succeeded),
        "FAILED" => Ok(TransferStatus::Failed),
        _ => Err(RepoError::Database(format!("Unknown transfer status: {}", s))),
    }
}

#[cfg(feature = "sqlite")]
pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
pub fn parse_decimal(s: &str) -> Result<rust_decimal::Decimal, RepoError> {
    s.parse::<rust_decimal::Decimal>()
        .map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

/// Fixed-width UTC text form used for every SQLite timestamp column.
#[cfg(feature = "sqlite")]
pub fn timestamp_text(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbAccount {
    /// Convert database row to domain Account.
    pub fn into_domain(self) -> Result<Account, RepoError> {
        let currency = parse_currency(&self.currency)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, balance, created_at, updated_at) = (
            AccountId::from_uuid(self.id),
            self.balance,
            self.created_at,
            self.updated_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, balance, created_at, updated_at) = (
            AccountId::from_uuid(parse_uuid(&self.id)?),
            parse_decimal(&self.balance)?,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        );

        Ok(Account {
            id,
            account_number: self.account_number,
            account_name: self.account_name,
            currency,
            balance,
            created_at,
            updated_at,
        })
    }
}

impl DbTransaction {
    /// Convert database row to domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        let direction = parse_direction(&self.direction)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, account_id, timestamp, amount, created_at) = (
            TransactionId::from_uuid(self.id),
            AccountId::from_uuid(self.account_id),
            self.transaction_timestamp,
            self.amount,
            self.created_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, account_id, timestamp, amount, created_at) = (
            TransactionId::from_uuid(parse_uuid(&self.id)?),
            AccountId::from_uuid(parse_uuid(&self.account_id)?),
            parse_timestamp(&self.transaction_timestamp)?,
            parse_decimal(&self.amount)?,
            parse_timestamp(&self.created_at)?,
        );

        Ok(Transaction::from_parts(
            id, account_id, timestamp, amount, direction, self.notes, created_at,
        ))
    }
}

impl DbExchangeRate {
    /// Convert database row to domain ExchangeRate.
    pub fn into_domain(self) -> Result<ExchangeRate, RepoError> {
        let from_currency = parse_currency(&self.from_currency)?;
        let to_currency = parse_currency(&self.to_currency)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, rate, valid_from, valid_to, created_at) = (
            ExchangeRateId::from_uuid(self.id),
            self.rate,
            self.valid_from,
            self.valid_to,
            self.created_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, rate, valid_from, valid_to, created_at) = (
            ExchangeRateId::from_uuid(parse_uuid(&self.id)?),
            parse_decimal(&self.rate)?,
            parse_timestamp(&self.valid_from)?,
            parse_timestamp(&self.valid_to)?,
            parse_timestamp(&self.created_at)?,
        );

        Ok(ExchangeRate {
            id,
            from_currency,
            to_currency,
            rate,
            valid_from,
            valid_to,
            created_at,
        })
    }
}

impl DbTransfer {
    /// Convert database row to domain Transfer.
    pub fn into_domain(self) -> Result<Transfer, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let status = parse_transfer_status(&self.status)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, from_account_id, to_account_id, amount, timestamp) = (
            TransferId::from_uuid(self.id),
            AccountId::from_uuid(self.from_account_id),
            AccountId::from_uuid(self.to_account_id),
            self.amount,
            self.transfer_timestamp,
        );

        #[cfg(feature = "sqlite")]
        let (id, from_account_id, to_account_id, amount, timestamp) = (
            TransferId::from_uuid(parse_uuid(&self.id)?),
            AccountId::from_uuid(parse_uuid(&self.from_account_id)?),
            AccountId::from_uuid(parse_uuid(&self.to_account_id)?),
            parse_decimal(&self.amount)?,
            parse_timestamp(&self.transfer_timestamp)?,
        );

        Ok(Transfer {
            id,
            from_account_id,
            to_account_id,
            currency,
            amount,
            notes: self.notes,
            timestamp,
            status,
        })
    }
}

impl DbBalance {
    pub fn into_decimal(self) -> Result<rust_decimal::Decimal, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        return Ok(self.balance);

        #[cfg(feature = "sqlite")]
        parse_decimal(&self.balance)
    }
}
