//! Bank Application Services
//!
//! Orchestrates domain operations through the repository port.
//! Contains NO infrastructure logic - pure business orchestration.

mod ledger;
mod rates;
mod transfer;

use std::sync::Arc;

use chrono::Utc;

use bank_types::{
    AppError, BalanceResponse, BankRepository, CurrencyCode, RepoError, Transfer, TransferId,
};

pub use ledger::AccountLedger;
pub use rates::ExchangeRateResolver;
pub use transfer::{CONVERTED_SCALE, TransferOrchestrator, to_base_units};

/// Maps a repository failure to the service taxonomy, logging it once.
fn repo_error(operation: &'static str, err: RepoError) -> AppError {
    match &err {
        RepoError::Database(_) | RepoError::Transaction(_) => {
            tracing::error!(operation, error = %err, "persistence failure");
        }
        _ => {}
    }
    err.into()
}

/// Application service bundling the resolver, the ledger and the orchestrator.
///
/// Generic over `R: BankRepository` - the adapter is injected at compile time.
/// All three components share one repository handle.
pub struct BankService<R: BankRepository> {
    rates: ExchangeRateResolver<R>,
    ledger: AccountLedger<R>,
    transfers: TransferOrchestrator<R>,
}

impl<R: BankRepository> BankService<R> {
    /// Creates a new bank service with the given repository.
    pub fn new(repo: R) -> Self {
        Self::from_shared(Arc::new(repo))
    }

    pub fn from_shared(repo: Arc<R>) -> Self {
        let rates = ExchangeRateResolver::new(Arc::clone(&repo));
        Self {
            ledger: AccountLedger::new(Arc::clone(&repo)),
            transfers: TransferOrchestrator::new(repo, rates.clone()),
            rates,
        }
    }

    pub fn rates(&self) -> &ExchangeRateResolver<R> {
        &self.rates
    }

    pub fn ledger(&self) -> &AccountLedger<R> {
        &self.ledger
    }

    pub fn transfers(&self) -> &TransferOrchestrator<R> {
        &self.transfers
    }

    /// Balance of an account plus its USD to IDR value at the current instant.
    #[tracing::instrument(skip(self))]
    pub async fn current_balance(&self, account_number: &str) -> Result<BalanceResponse, AppError> {
        let now = Utc::now();
        let amount = self.ledger.balance(account_number).await?;
        let rate = self
            .rates
            .resolve(CurrencyCode::USD, CurrencyCode::IDR, now)
            .await?;
        let amount_converted = amount.checked_mul(rate).ok_or_else(|| {
            AppError::Unknown(format!("balance {} overflows at rate {}", amount, rate))
        })?;

        Ok(BalanceResponse {
            account_number: account_number.to_string(),
            amount,
            amount_converted,
            converted_currency: CurrencyCode::IDR,
            current_date: now.date_naive(),
        })
    }

    /// Stored record of a transfer, including its final status.
    pub async fn transfer_record(&self, id: TransferId) -> Result<Transfer, AppError> {
        self.transfers
            .record(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer {} not found", id)))
    }
}
