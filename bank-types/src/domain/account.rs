//! Account domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::TransactionDirection;
use super::uuid_id;
use crate::CurrencyCode;
use crate::error::DomainError;

uuid_id!(
    /// Unique identifier for an Account.
    AccountId
);

/// A bank account holding a balance in the ledger's base unit.
///
/// Accounts are provisioned with a zero balance; afterwards the balance only
/// moves through applied transactions, so it always equals the signed sum of
/// the account's transaction rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Human-facing account number (unique)
    pub account_number: String,
    pub account_name: String,
    pub currency: CurrencyCode,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new account with zero balance.
    ///
    /// # Validation
    /// - Account number cannot be empty
    /// - Account name cannot be empty
    pub fn new(
        account_number: String,
        account_name: String,
        currency: CurrencyCode,
    ) -> Result<Self, DomainError> {
        if account_number.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Account number cannot be empty".into(),
            ));
        }
        if account_name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Account name cannot be empty".into(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: AccountId::new(),
            account_number,
            account_name,
            currency,
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        })
    }

    /// Checks if the account can cover an outgoing amount.
    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

/// Balance left after applying `amount` in `direction` to `balance`.
///
/// Debits may not take the balance below zero. Both repository adapters call
/// this with the balance read inside their atomic unit.
pub fn next_balance(
    balance: Decimal,
    direction: TransactionDirection,
    amount: Decimal,
) -> Result<Decimal, DomainError> {
    if amount < Decimal::ZERO {
        return Err(DomainError::NegativeAmount);
    }

    let overflow = || DomainError::AmountOverflow { balance, amount };
    match direction {
        TransactionDirection::In => balance.checked_add(amount).ok_or_else(overflow),
        TransactionDirection::Out if balance < amount => Err(DomainError::InsufficientFunds {
            available: balance,
            requested: amount,
        }),
        TransactionDirection::Out => balance.checked_sub(amount).ok_or_else(overflow),
        TransactionDirection::Unknown => Err(DomainError::UnknownDirection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_creation() {
        let account =
            Account::new("1001".to_string(), "Alice".to_string(), CurrencyCode::USD).unwrap();
        assert_eq!(account.account_number, "1001");
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.created_at, account.updated_at);
        assert!(account.has_sufficient_funds(Decimal::ZERO));
        assert!(!account.has_sufficient_funds(dec!(0.01)));
    }

    #[test]
    fn test_empty_number_fails() {
        let result = Account::new(" ".to_string(), "Alice".to_string(), CurrencyCode::USD);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_next_balance_credit_and_debit() {
        assert_eq!(
            next_balance(dec!(100), TransactionDirection::In, dec!(25.5)).unwrap(),
            dec!(125.5)
        );
        assert_eq!(
            next_balance(dec!(100), TransactionDirection::Out, dec!(100)).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_insufficient_funds() {
        let result = next_balance(dec!(10), TransactionDirection::Out, dec!(10.01));
        assert!(matches!(result, Err(DomainError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_unknown_direction_and_negative_amount_rejected() {
        let result = next_balance(dec!(10), TransactionDirection::Unknown, dec!(1));
        assert!(matches!(result, Err(DomainError::UnknownDirection)));

        let result = next_balance(dec!(10), TransactionDirection::In, dec!(-1));
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_credit_overflow_is_an_error() {
        let result = next_balance(Decimal::MAX, TransactionDirection::In, dec!(1));
        assert!(matches!(result, Err(DomainError::AmountOverflow { .. })));

        // A full debit still works at the limit.
        assert_eq!(
            next_balance(Decimal::MAX, TransactionDirection::Out, Decimal::MAX).unwrap(),
            Decimal::ZERO
        );
    }
}
