//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::CurrencyCode;
use crate::domain::{
    Account, AccountId, Transaction, TransactionDirection, TransactionId, Transfer, TransferId,
    TransferStatus,
};

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to provision a new account with zero balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// Unique, human-facing account number
    #[schema(example = "7710001")]
    pub account_number: String,
    /// Name of the account holder
    #[schema(example = "Alice")]
    pub account_name: String,
    #[serde(default = "default_currency")]
    pub currency: CurrencyCode,
}

fn default_currency() -> CurrencyCode {
    CurrencyCode::USD
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: AccountId,
    #[schema(example = "7710001")]
    pub account_number: String,
    #[schema(example = "Alice")]
    pub account_name: String,
    pub currency: CurrencyCode,
    /// Balance in the ledger's base unit (USD)
    #[schema(value_type = String, example = "150.25")]
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_number: account.account_number,
            account_name: account.account_name,
            currency: account.currency,
            balance: account.balance,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Current balance plus its value in the converted currency.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub account_number: String,
    #[schema(value_type = String, example = "10")]
    pub amount: Decimal,
    #[schema(value_type = String, example = "21000")]
    pub amount_converted: Decimal,
    pub converted_currency: CurrencyCode,
    pub current_date: NaiveDate,
}

/// One row of an account's transaction history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub timestamp: DateTime<Utc>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub direction: TransactionDirection,
    pub notes: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            timestamp: tx.timestamp,
            amount: tx.amount,
            direction: tx.direction,
            notes: tx.notes,
        }
    }
}

/// Stored transfer audit record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRecordResponse {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub currency: CurrencyCode,
    /// Converted amount in the ledger's base unit
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
    pub status: TransferStatus,
}

impl From<Transfer> for TransferRecordResponse {
    fn from(t: Transfer) -> Self {
        Self {
            id: t.id,
            from_account_id: t.from_account_id,
            to_account_id: t.to_account_id,
            currency: t.currency,
            amount: t.amount,
            notes: t.notes,
            timestamp: t.timestamp,
            status: t.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming messages
// ─────────────────────────────────────────────────────────────────────────────

/// Opens a rate feed. Currencies stay raw strings so an unknown code can be
/// reported back with the exact value the client sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateRequest {
    pub from_currency: String,
    pub to_currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateResponse {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    /// RFC 3339, second precision
    pub timestamp: String,
}

/// One inbound message of the summarizer stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionMessage {
    pub account_number: String,
    pub amount: Decimal,
    #[serde(rename = "type", default)]
    pub direction: TransactionDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummaryResponse {
    pub account_number: String,
    pub sum_amount_in: Decimal,
    pub sum_amount_out: Decimal,
    pub sum_amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// One inbound message of the transfer pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account: String,
    pub to_account: String,
    pub currency: String,
    pub amount: Decimal,
    #[serde(default)]
    pub notes: String,
}

/// Outcome reported per transfer on the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferOutcome {
    Success,
    Failed,
}

impl From<bool> for TransferOutcome {
    fn from(success: bool) -> Self {
        if success {
            TransferOutcome::Success
        } else {
            TransferOutcome::Failed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub transfer_id: TransferId,
    pub from_account: String,
    pub to_account: String,
    pub currency: String,
    /// Amount as requested, in `currency`
    pub amount: Decimal,
    pub status: TransferOutcome,
    pub timestamp: DateTime<Utc>,
}
