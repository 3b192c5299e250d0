//! Exchange rate resolution over time windows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bank_types::{AppError, BankRepository, CurrencyCode, ExchangeRateId, NewExchangeRate};

use super::repo_error;

/// Finds the single rate window covering an instant and records new windows.
pub struct ExchangeRateResolver<R: BankRepository> {
    repo: Arc<R>,
}

impl<R: BankRepository> Clone for ExchangeRateResolver<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: BankRepository> ExchangeRateResolver<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Parses a raw currency pair, reporting both values when either is unknown.
    pub fn parse_pair(from: &str, to: &str) -> Result<(CurrencyCode, CurrencyCode), AppError> {
        match (from.parse::<CurrencyCode>(), to.parse::<CurrencyCode>()) {
            (Ok(from), Ok(to)) => Ok((from, to)),
            _ => Err(AppError::InvalidCurrency {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    /// Rate of `to` per unit of `from` at `at`.
    ///
    /// Zero matching windows and more than one matching window are both
    /// `NotFound`: an ambiguous lookup has no answer.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        at: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        let rows = self
            .repo
            .get_rates_at_timestamp(from, to, at)
            .await
            .map_err(|e| repo_error("get_rates_at_timestamp", e))?;

        match rows.as_slice() {
            [only] => Ok(only.rate),
            [] => Err(AppError::NotFound(format!(
                "Exchange rate from {} to {} on {} not found",
                from,
                to,
                at.to_rfc3339()
            ))),
            _ => {
                tracing::warn!(%from, %to, %at, "overlapping rate windows");
                Err(AppError::NotFound(format!(
                    "Exchange rate from {} to {} on {} is ambiguous",
                    from,
                    to,
                    at.to_rfc3339()
                )))
            }
        }
    }

    /// Stores a new rate window. Overlap with existing windows is not checked.
    #[tracing::instrument(
        skip(self, rate),
        fields(from = %rate.from_currency, to = %rate.to_currency, rate = %rate.rate)
    )]
    pub async fn record(&self, rate: NewExchangeRate) -> Result<ExchangeRateId, AppError> {
        rate.validate()?;
        self.repo
            .insert_rate(rate)
            .await
            .map_err(|e| repo_error("insert_rate", e))
    }
}
