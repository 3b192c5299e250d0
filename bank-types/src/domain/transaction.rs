//! Transaction domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::uuid_id;
use crate::error::DomainError;

uuid_id!(
    /// Unique identifier for a Transaction.
    TransactionId
);

/// Whether a transaction increases or decreases an account balance.
///
/// Anything other than `IN` / `OUT` deserializes to `Unknown`, which is
/// carried as far as validation and then rejected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum TransactionDirection {
    In,
    Out,
    #[default]
    Unknown,
}

impl TransactionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionDirection::In => "IN",
            TransactionDirection::Out => "OUT",
            TransactionDirection::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for TransactionDirection {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

impl From<&str> for TransactionDirection {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "IN" => TransactionDirection::In,
            "OUT" => TransactionDirection::Out,
            _ => TransactionDirection::Unknown,
        }
    }
}

impl std::fmt::Display for TransactionDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded balance movement on a single account.
///
/// Transactions are immutable once created - they represent
/// a historical record of what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Account whose balance this transaction moved
    pub account_id: AccountId,
    /// When the movement happened (client supplied or server clock)
    pub timestamp: DateTime<Utc>,
    /// Unsigned magnitude; the sign lives in `direction`
    pub amount: Decimal,
    pub direction: TransactionDirection,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction, rejecting values that must never be persisted.
    pub fn new(
        account_id: AccountId,
        amount: Decimal,
        direction: TransactionDirection,
        notes: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if amount < Decimal::ZERO {
            return Err(DomainError::NegativeAmount);
        }
        if direction == TransactionDirection::Unknown {
            return Err(DomainError::UnknownDirection);
        }

        Ok(Self {
            id: TransactionId::new(),
            account_id,
            timestamp,
            amount,
            direction,
            notes: notes.into(),
            created_at: Utc::now(),
        })
    }

    /// Debit leg of a transfer.
    pub fn debit(account_id: AccountId, amount: Decimal, notes: &str) -> Result<Self, DomainError> {
        Self::new(account_id, amount, TransactionDirection::Out, notes, Utc::now())
    }

    /// Credit leg of a transfer.
    pub fn credit(
        account_id: AccountId,
        amount: Decimal,
        notes: &str,
    ) -> Result<Self, DomainError> {
        Self::new(account_id, amount, TransactionDirection::In, notes, Utc::now())
    }

    /// Amount with the direction applied (+ for in, - for out).
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            TransactionDirection::In => self.amount,
            TransactionDirection::Out => -self.amount,
            TransactionDirection::Unknown => Decimal::ZERO,
        }
    }

    /// Reconstructs a transaction from database fields.
    pub fn from_parts(
        id: TransactionId,
        account_id: AccountId,
        timestamp: DateTime<Utc>,
        amount: Decimal,
        direction: TransactionDirection,
        notes: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            timestamp,
            amount,
            direction,
            notes,
            created_at,
        }
    }
}
