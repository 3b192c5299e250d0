//! Two-account, currency-converting transfers.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};

use bank_types::{
    AppError, BASE_CURRENCY, BankRepository, CurrencyCode, Transaction, Transfer, TransferError,
    TransferId, TransferStatus,
};

use super::rates::ExchangeRateResolver;
use super::repo_error;

/// Decimal places kept on converted transfer amounts.
pub const CONVERTED_SCALE: u32 = 8;

/// Converts `amount` in `currency` to the base unit using `base_to_currency`
/// (units of `currency` per one base unit).
pub fn to_base_units(amount: Decimal, base_to_currency: Decimal) -> Option<Decimal> {
    amount
        .checked_div(base_to_currency)
        .map(|v| v.round_dp_with_strategy(CONVERTED_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

/// Moves money between two accounts as one debit and one credit.
pub struct TransferOrchestrator<R: BankRepository> {
    repo: Arc<R>,
    rates: ExchangeRateResolver<R>,
}

impl<R: BankRepository> Clone for TransferOrchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            rates: self.rates.clone(),
        }
    }
}

impl<R: BankRepository> TransferOrchestrator<R> {
    pub fn new(repo: Arc<R>, rates: ExchangeRateResolver<R>) -> Self {
        Self { repo, rates }
    }

    /// Transfers `amount` of `currency` from one account number to another.
    ///
    /// A `Pending` record is written before any money moves and is finalized
    /// once the debit/credit pair commits or rolls back. If finalizing fails
    /// after the pair committed, the money has moved and `RecordFailed` is
    /// returned anyway; callers must check the record before retrying.
    #[tracing::instrument(skip(self, notes))]
    pub async fn transfer(
        &self,
        from_number: &str,
        to_number: &str,
        currency: &str,
        amount: Decimal,
        notes: &str,
    ) -> Result<(TransferId, bool), TransferError> {
        if amount < Decimal::ZERO {
            return Err(TransferError::RecordFailed(format!(
                "amount {} must not be negative",
                amount
            )));
        }

        let currency: CurrencyCode = currency
            .parse()
            .map_err(|e: bank_types::UnknownCurrency| TransferError::RecordFailed(e.to_string()))?;

        if from_number == to_number {
            return Err(TransferError::RecordFailed(format!(
                "cannot transfer from account {} to itself",
                from_number
            )));
        }

        let converted = self.convert(currency, amount).await?;

        let source = self
            .repo
            .get_account_by_number(from_number)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "source lookup failed");
                TransferError::RecordFailed(e.to_string())
            })?
            .ok_or_else(|| TransferError::SourceAccountNotFound(from_number.to_string()))?;

        if !source.has_sufficient_funds(converted) {
            return Err(TransferError::TransactionPair(format!(
                "insufficient funds in account {}: available {}, requested {}",
                from_number, source.balance, converted
            )));
        }

        let destination = self
            .repo
            .get_account_by_number(to_number)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "destination lookup failed");
                TransferError::RecordFailed(e.to_string())
            })?
            .ok_or_else(|| TransferError::DestinationAccountNotFound(to_number.to_string()))?;

        let transfer = Transfer::pending(source.id, destination.id, currency, converted, notes);
        let transfer_id = self.repo.create_transfer(&transfer).await.map_err(|e| {
            tracing::error!(error = %e, "failed to create transfer record");
            TransferError::RecordFailed(e.to_string())
        })?;

        let debit = Transaction::debit(source.id, converted, notes)
            .map_err(|e| TransferError::RecordFailed(e.to_string()))?;
        let credit = Transaction::credit(destination.id, converted, notes)
            .map_err(|e| TransferError::RecordFailed(e.to_string()))?;

        let pair = self.repo.apply_transfer_pair(&debit, &credit).await;
        let status = TransferStatus::from_outcome(pair.is_ok());
        let finalized = self.repo.update_transfer_status(transfer_id, status).await;

        match (pair, finalized) {
            (Ok(()), Ok(())) => {
                tracing::info!(%transfer_id, %converted, "transfer succeeded");
                Ok((transfer_id, true))
            }
            (Ok(()), Err(e)) => {
                tracing::error!(
                    %transfer_id,
                    error = %e,
                    "money moved but transfer status was not recorded"
                );
                Err(TransferError::RecordFailed(format!(
                    "transfer {} applied but status update failed: {}",
                    transfer_id, e
                )))
            }
            (Err(e), finalized) => {
                if let Err(status_err) = finalized {
                    tracing::error!(
                        %transfer_id,
                        error = %status_err,
                        "failed to mark transfer as failed"
                    );
                }
                tracing::warn!(%transfer_id, error = %e, "transaction pair rolled back");
                Err(TransferError::TransactionPair(e.to_string()))
            }
        }
    }

    pub async fn record(&self, id: TransferId) -> Result<Option<Transfer>, AppError> {
        self.repo
            .get_transfer(id)
            .await
            .map_err(|e| repo_error("get_transfer", e))
    }

    async fn convert(
        &self,
        currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<Decimal, TransferError> {
        if currency.is_base() {
            return Ok(amount);
        }

        let rate = self
            .rates
            .resolve(BASE_CURRENCY, currency, Utc::now())
            .await
            .map_err(|e| TransferError::RecordFailed(e.to_string()))?;

        to_base_units(amount, rate).ok_or_else(|| {
            TransferError::RecordFailed(format!(
                "cannot convert {} {} at rate {}",
                amount, currency, rate
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_base_units_rounds_to_scale() {
        assert_eq!(to_base_units(dec!(21000), dec!(2100)), Some(dec!(10)));
        assert_eq!(to_base_units(dec!(1), dec!(3)), Some(dec!(0.33333333)));
        assert_eq!(
            to_base_units(dec!(0.000000005), Decimal::ONE),
            Some(dec!(0.00000001))
        );
        assert_eq!(to_base_units(Decimal::ONE, Decimal::ZERO), None);
    }
}
