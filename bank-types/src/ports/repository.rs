//! Repository port trait.
//!
//! The single persistence port of the bank service.
//! Adapters (Postgres, SQLite, in-memory mocks) implement this trait.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::CurrencyCode;
use crate::domain::{
    Account, AccountId, ExchangeRate, ExchangeRateId, NewExchangeRate, Transaction, TransactionId,
    Transfer, TransferId, TransferStatus,
};
use crate::dto::CreateAccountRequest;
use crate::error::RepoError;

/// Persistence port for accounts, transactions, transfers and rates.
///
/// Every operation that touches a balance MUST be all-or-nothing and must
/// re-check sufficiency inside its own atomic unit, so concurrent debits can
/// never drive a balance negative.
#[async_trait::async_trait]
pub trait BankRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a new account with zero balance.
    ///
    /// Fails with `RepoError::Conflict` when the account number is taken.
    async fn create_account(&self, req: CreateAccountRequest) -> Result<Account, RepoError>;

    async fn get_account_by_number(&self, number: &str) -> Result<Option<Account>, RepoError>;

    async fn get_balance_by_number(&self, number: &str) -> Result<Option<Decimal>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Exchange Rates
    // ─────────────────────────────────────────────────────────────────────────────

    async fn insert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRateId, RepoError>;

    /// Returns the windows for the pair that contain `at` (both ends inclusive).
    ///
    /// Implementations may cap the result at two rows; callers only need to
    /// tell "exactly one" apart from "none" and "ambiguous".
    async fn get_rates_at_timestamp(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        at: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRate>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Balance-affecting Operations (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts `tx` and moves the account balance by its signed amount.
    ///
    /// Returns `RepoError::Domain(DomainError::InsufficientFunds)` when an
    /// outgoing amount exceeds the balance at commit time.
    async fn apply_account_transaction(
        &self,
        account: &Account,
        tx: &Transaction,
    ) -> Result<TransactionId, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Transfers
    // ─────────────────────────────────────────────────────────────────────────────

    async fn create_transfer(&self, transfer: &Transfer) -> Result<TransferId, RepoError>;

    /// Writes the debit and credit rows and both balance updates as one unit.
    async fn apply_transfer_pair(
        &self,
        debit: &Transaction,
        credit: &Transaction,
    ) -> Result<(), RepoError>;

    async fn update_transfer_status(
        &self,
        id: TransferId,
        status: TransferStatus,
    ) -> Result<(), RepoError>;

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists transactions for an account, oldest first.
    async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, RepoError>;
}
