//! Currency table and synthetic exchange-rate windows.
//!
//! Currencies are declared once through the `define_currencies!` macro, which
//! generates the runtime [`CurrencyCode`] enum together with the anchor
//! values used by the synthetic generator.
//!
//! # Adding a New Currency
//! Add a line to the macro invocation:
//! ```ignore
//! define_currencies! {
//!     // ... existing currencies ...
//!     EUR => ("EUR", 1, 0),
//! }
//! ```
//!
//! # Example
//! ```
//! use chrono::Utc;
//! use exchange_rates::{CurrencyCode, SyntheticRates};
//! use std::time::Duration;
//!
//! let mut rates = SyntheticRates::with_seed(CurrencyCode::USD, CurrencyCode::IDR, Duration::from_secs(5), 7);
//! let [forward, reverse] = rates.next_windows(Utc::now());
//! assert_eq!(forward.from, CurrencyCode::USD);
//! assert_eq!(reverse.from, CurrencyCode::IDR);
//! ```

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// Currency every ledger balance is settled in.
pub const BASE_CURRENCY: CurrencyCode = CurrencyCode::USD;

/// Offset between the moment a window is generated and the moment it opens.
pub const WINDOW_LEAD: TimeDelta = TimeDelta::seconds(3);

/// Decimal places kept on a reversed (1 / rate) quote.
const REVERSE_RATE_SCALE: u32 = 12;

/// Error returned when a currency code is outside the supported table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown currency: {0}")]
pub struct UnknownCurrency(pub String);

// ─────────────────────────────────────────────────────────────────────────────
// THE MACRO: Defines the CurrencyCode enum and its metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Macro to define the supported currency table.
///
/// # Syntax
/// ```ignore
/// define_currencies! {
///     Name => ("CODE", units_per_base, spread),
/// }
/// ```
///
/// `units_per_base` is the anchor value of one base unit expressed in this
/// currency; `spread` is the width of the random band added on top of the
/// anchor by the synthetic generator.
#[macro_export]
macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $per_base:expr, $spread:expr)
        ),* $(,)?
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
        #[serde(rename_all = "UPPERCASE")]
        pub enum CurrencyCode {
            $($name),*
        }

        impl CurrencyCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $code),*
                }
            }

            /// Anchor value of one base unit in this currency.
            pub fn units_per_base(&self) -> u32 {
                match self {
                    $(CurrencyCode::$name => $per_base),*
                }
            }

            pub fn spread(&self) -> u32 {
                match self {
                    $(CurrencyCode::$name => $spread),*
                }
            }
        }

        impl std::fmt::Display for CurrencyCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for CurrencyCode {
            type Err = UnknownCurrency;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok(CurrencyCode::$name),)*
                    _ => Err(UnknownCurrency(s.to_string())),
                }
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// CURRENCY DEFINITIONS
// ─────────────────────────────────────────────────────────────────────────────

define_currencies! {
    USD => ("USD", 1, 0),
    IDR => ("IDR", 2000, 300),
}

impl CurrencyCode {
    /// Returns true for the settlement currency.
    pub fn is_base(&self) -> bool {
        *self == BASE_CURRENCY
    }
}

/// Drops the sub-second part of a timestamp.
pub fn truncate_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_nanosecond(0).unwrap_or(at)
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthetic windows
// ─────────────────────────────────────────────────────────────────────────────

/// One generated rate together with the window it is valid for.
#[derive(Debug, Clone, PartialEq)]
pub struct RateWindow {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

/// Produces back-to-back rate windows for one currency pair.
///
/// Every call to [`SyntheticRates::next_windows`] draws a fresh quote and
/// returns it together with its reverse, both valid for the same window.
pub struct SyntheticRates {
    from: CurrencyCode,
    to: CurrencyCode,
    interval: Duration,
    rng: StdRng,
}

impl SyntheticRates {
    pub fn new(from: CurrencyCode, to: CurrencyCode, interval: Duration) -> Self {
        Self {
            from,
            to,
            interval,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic generator for tests.
    pub fn with_seed(from: CurrencyCode, to: CurrencyCode, interval: Duration, seed: u64) -> Self {
        Self {
            from,
            to,
            interval,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forward and reverse quotes for the window opening shortly after `now`.
    ///
    /// The window opens [`WINDOW_LEAD`] after `now` (truncated to the second)
    /// and closes one millisecond before the next window would open.
    pub fn next_windows(&mut self, now: DateTime<Utc>) -> [RateWindow; 2] {
        let valid_from = truncate_to_second(now) + WINDOW_LEAD;
        let length = TimeDelta::from_std(self.interval).unwrap_or(TimeDelta::seconds(5));
        let valid_to = valid_from + length - TimeDelta::milliseconds(1);

        let rate = self.sample(self.to) / self.sample(self.from);
        let reverse = (Decimal::ONE / rate).round_dp(REVERSE_RATE_SCALE);

        [
            RateWindow {
                from: self.from,
                to: self.to,
                rate,
                valid_from,
                valid_to,
            },
            RateWindow {
                from: self.to,
                to: self.from,
                rate: reverse,
                valid_from,
                valid_to,
            },
        ]
    }

    fn sample(&mut self, currency: CurrencyCode) -> Decimal {
        let spread = currency.spread();
        let noise = if spread == 0 {
            0
        } else {
            self.rng.random_range(0..spread)
        };
        Decimal::from(currency.units_per_base() + noise)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap() + TimeDelta::milliseconds(ms as i64)
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("idr".parse::<CurrencyCode>().unwrap(), CurrencyCode::IDR);
        assert_eq!(
            "EUR".parse::<CurrencyCode>(),
            Err(UnknownCurrency("EUR".to_string()))
        );
    }

    #[test]
    fn test_currency_code_display() {
        assert_eq!(CurrencyCode::IDR.to_string(), "IDR");
        assert_eq!(CurrencyCode::IDR.code(), "IDR");
    }

    #[test]
    fn test_base_currency() {
        assert_eq!(BASE_CURRENCY, CurrencyCode::USD);
        assert!(CurrencyCode::USD.is_base());
        assert!(!CurrencyCode::IDR.is_base());
    }

    #[test]
    fn test_truncate_to_second() {
        assert_eq!(truncate_to_second(at(10, 0, 5, 750)), at(10, 0, 5, 0));
    }

    #[test]
    fn test_window_bounds() {
        let mut rates = SyntheticRates::with_seed(
            CurrencyCode::USD,
            CurrencyCode::IDR,
            Duration::from_secs(5),
            1,
        );
        let [forward, reverse] = rates.next_windows(at(10, 0, 0, 400));

        assert_eq!(forward.valid_from, at(10, 0, 3, 0));
        assert_eq!(forward.valid_to, at(10, 0, 7, 999));
        assert_eq!(reverse.valid_from, forward.valid_from);
        assert_eq!(reverse.valid_to, forward.valid_to);
    }

    #[test]
    fn test_generated_rate_within_band() {
        let mut rates = SyntheticRates::with_seed(
            CurrencyCode::USD,
            CurrencyCode::IDR,
            Duration::from_secs(5),
            42,
        );
        for _ in 0..50 {
            let [forward, reverse] = rates.next_windows(Utc::now());
            assert!(forward.rate >= Decimal::from(2000));
            assert!(forward.rate < Decimal::from(2300));
            assert_eq!(reverse.from, CurrencyCode::IDR);
            assert_eq!(reverse.to, CurrencyCode::USD);
            assert!((reverse.rate * forward.rate - Decimal::ONE).abs() < Decimal::new(1, 6));
        }
    }
}
