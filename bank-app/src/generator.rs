//! Background task publishing synthetic exchange rates.

use chrono::{DateTime, Utc};
use exchange_rates::{RateWindow, SyntheticRates};

use bank_hex::rpc::CallContext;
use bank_hex::service::ExchangeRateResolver;
use bank_types::{AppError, BankRepository};

/// Records the forward and reverse windows for `now`.
pub async fn publish_once<R: BankRepository>(
    rates: &ExchangeRateResolver<R>,
    generator: &mut SyntheticRates,
    now: DateTime<Utc>,
) -> Result<[RateWindow; 2], AppError> {
    let windows = generator.next_windows(now);
    for window in &windows {
        rates.record(window.clone().into()).await?;
    }
    Ok(windows)
}

/// Publishes a new pair of windows every generator interval until cancelled.
///
/// A failed write is logged and retried on the next tick.
pub async fn run<R: BankRepository>(
    rates: ExchangeRateResolver<R>,
    mut generator: SyntheticRates,
    ctx: CallContext,
) {
    let mut ticker = tokio::time::interval(generator.interval());
    loop {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match publish_once(&rates, &mut generator, Utc::now()).await {
            Ok([forward, _]) => tracing::debug!(
                from = %forward.from,
                to = %forward.to,
                rate = %forward.rate,
                valid_from = %forward.valid_from,
                "published rate window"
            ),
            Err(e) => tracing::warn!(error = %e, "failed to publish rate window"),
        }
    }

    tracing::info!("rate generator stopped");
}
