//! Exchange rate windows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::uuid_id;
use crate::CurrencyCode;
use crate::error::DomainError;

uuid_id!(
    /// Unique identifier for a stored exchange rate window.
    ExchangeRateId
);

/// A rate for one currency pair, valid over `[valid_from, valid_to]`
/// (both ends inclusive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: ExchangeRateId,
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    /// Units of `to_currency` per one unit of `from_currency`
    pub rate: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Returns true when `at` falls inside the validity window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at <= self.valid_to
    }
}

/// A rate window that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExchangeRate {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub rate: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

impl NewExchangeRate {
    /// Rejects windows that could never match a lookup.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.rate <= Decimal::ZERO {
            return Err(DomainError::ValidationError(
                "Exchange rate must be positive".into(),
            ));
        }
        if self.valid_from > self.valid_to {
            return Err(DomainError::InvalidRateWindow {
                valid_from: self.valid_from,
                valid_to: self.valid_to,
            });
        }
        Ok(())
    }

    /// Assigns an identity, producing the stored form.
    pub fn into_rate(self) -> ExchangeRate {
        ExchangeRate {
            id: ExchangeRateId::new(),
            from_currency: self.from_currency,
            to_currency: self.to_currency,
            rate: self.rate,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            created_at: Utc::now(),
        }
    }
}

impl From<exchange_rates::RateWindow> for NewExchangeRate {
    fn from(window: exchange_rates::RateWindow) -> Self {
        Self {
            from_currency: window.from,
            to_currency: window.to,
            rate: window.rate,
            valid_from: window.valid_from,
            valid_to: window.valid_to,
        }
    }
}
