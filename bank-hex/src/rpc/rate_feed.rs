use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::sync::mpsc;

use bank_types::{
    BankRepository, ExchangeRateRequest, ExchangeRateResponse, Status, truncate_to_second,
};

use super::{CallContext, Completion, status};
use crate::service::ExchangeRateResolver;

pub const DEFAULT_TICK: Duration = Duration::from_secs(3);

/// Server stream of the rate for one currency pair, one message per tick.
///
/// The first message is sent immediately. The feed ends normally when the
/// client cancels and with an error on the first tick that cannot resolve.
#[tracing::instrument(skip_all, fields(from = %req.from_currency, to = %req.to_currency))]
pub async fn fetch_exchange_rates<R: BankRepository>(
    resolver: &ExchangeRateResolver<R>,
    ctx: CallContext,
    req: ExchangeRateRequest,
    tick: Duration,
    out: mpsc::Sender<ExchangeRateResponse>,
) -> Result<Completion, Status> {
    let (from, to) = ExchangeRateResolver::<R>::parse_pair(&req.from_currency, &req.to_currency)
        .map_err(|_| status::invalid_currency(&req.from_currency, &req.to_currency))?;

    let mut ticker = tokio::time::interval(tick);
    loop {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if ctx.is_cancelled() {
            break;
        }

        let at = truncate_to_second(Utc::now());
        let rate = resolver
            .resolve(from, to, at)
            .await
            .map_err(|e| status::rate_unavailable(&e, &req))?;

        let message = ExchangeRateResponse {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let sent = tokio::select! {
            biased;
            _ = ctx.cancelled() => break,
            sent = out.send(message) => sent,
        };
        if sent.is_err() {
            break;
        }
    }

    tracing::debug!("rate feed cancelled by client");
    Ok(Completion::Cancelled)
}
