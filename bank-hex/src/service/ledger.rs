//! Single-account balance operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bank_types::{
    Account, AppError, BankRepository, CreateAccountRequest, Transaction, TransactionDirection,
    TransactionId,
};

use super::repo_error;

/// Applies balance-affecting transactions to one account at a time.
pub struct AccountLedger<R: BankRepository> {
    repo: Arc<R>,
}

impl<R: BankRepository> Clone for AccountLedger<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: BankRepository> AccountLedger<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Provisions an account with zero balance.
    #[tracing::instrument(skip(self), fields(account_number = %req.account_number))]
    pub async fn create_account(&self, req: CreateAccountRequest) -> Result<Account, AppError> {
        if req.account_number.trim().is_empty() {
            return Err(AppError::invalid_argument(
                "account_number",
                "Account number cannot be empty",
            ));
        }
        if req.account_name.trim().is_empty() {
            return Err(AppError::invalid_argument(
                "account_name",
                "Account name cannot be empty",
            ));
        }

        self.repo
            .create_account(req)
            .await
            .map_err(|e| repo_error("create_account", e))
    }

    pub async fn detail(&self, account_number: &str) -> Result<Account, AppError> {
        self.repo
            .get_account_by_number(account_number)
            .await
            .map_err(|e| repo_error("get_account_by_number", e))?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", account_number)))
    }

    pub async fn balance(&self, account_number: &str) -> Result<Decimal, AppError> {
        self.repo
            .get_balance_by_number(account_number)
            .await
            .map_err(|e| repo_error("get_balance_by_number", e))?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", account_number)))
    }

    /// Lists an account's transactions, oldest first.
    pub async fn history(&self, account_number: &str) -> Result<Vec<Transaction>, AppError> {
        let account = self.detail(account_number).await?;
        self.repo
            .list_transactions_for_account(account.id)
            .await
            .map_err(|e| repo_error("list_transactions_for_account", e))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Transaction Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Applies one transaction to the account identified by `account_number`.
    ///
    /// An outgoing amount larger than the balance fails with
    /// `InsufficientFunds` and leaves no trace. The adapter re-checks the
    /// balance inside its atomic unit, so a concurrent debit that wins the
    /// race surfaces the same error.
    #[tracing::instrument(skip(self, notes))]
    pub async fn apply(
        &self,
        account_number: &str,
        amount: Decimal,
        direction: TransactionDirection,
        notes: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<TransactionId, AppError> {
        if amount < Decimal::ZERO {
            return Err(AppError::invalid_argument(
                "amount",
                format!("Requested amount {} is negative", amount),
            ));
        }
        if direction == TransactionDirection::Unknown {
            return Err(AppError::invalid_argument(
                "type",
                "Transaction type must be IN or OUT",
            ));
        }

        let account = self.detail(account_number).await?;

        if direction == TransactionDirection::Out && !account.has_sufficient_funds(amount) {
            return Err(AppError::InsufficientFunds {
                available: account.balance,
                requested: amount,
            });
        }

        let tx = Transaction::new(
            account.id,
            amount,
            direction,
            notes,
            timestamp.unwrap_or_else(Utc::now),
        )?;

        let id = self
            .repo
            .apply_account_transaction(&account, &tx)
            .await
            .map_err(|e| repo_error("apply_account_transaction", e))?;

        tracing::debug!(transaction_id = %id, "transaction applied");
        Ok(id)
    }
}
