//! Transfer audit record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::uuid_id;
use crate::CurrencyCode;

uuid_id!(
    /// Unique identifier for a Transfer.
    TransferId
);

/// Lifecycle of a transfer record.
///
/// A record is written as `Pending` before any money moves and transitions
/// exactly once to `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
}

impl TransferStatus {
    /// Status matching the outcome of the transaction pair.
    pub fn from_outcome(success: bool) -> Self {
        if success {
            TransferStatus::Succeeded
        } else {
            TransferStatus::Failed
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl AsRef<str> for TransferStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Audit record for a two-account transfer.
///
/// `amount` is the converted amount in the ledger's base unit; `currency`
/// is the currency the client asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub currency: CurrencyCode,
    pub amount: Decimal,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
    pub status: TransferStatus,
}

impl Transfer {
    /// Creates a pending transfer record.
    pub fn pending(
        from_account_id: AccountId,
        to_account_id: AccountId,
        currency: CurrencyCode,
        amount: Decimal,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: TransferId::new(),
            from_account_id,
            to_account_id,
            currency,
            amount,
            notes: notes.into(),
            timestamp: Utc::now(),
            status: TransferStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_transfer() {
        let transfer = Transfer::pending(
            AccountId::new(),
            AccountId::new(),
            CurrencyCode::IDR,
            Decimal::ONE,
            "lunch",
        );
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert!(!transfer.status.is_final());
    }

    #[test]
    fn test_status_from_outcome() {
        assert_eq!(TransferStatus::from_outcome(true), TransferStatus::Succeeded);
        assert_eq!(TransferStatus::from_outcome(false), TransferStatus::Failed);
        assert_eq!(TransferStatus::Failed.to_string(), "FAILED");
    }
}
